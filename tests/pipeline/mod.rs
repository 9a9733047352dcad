use crate::helpers::FixtureBuilder;
use elixir_indexer::{
    codec::{Codec, DefEntry, DefKind, DefList},
    family::{compatible_family, compatible_macro, Family, CACHED_DEF_FAMILIES},
    store::{blob::BlobStore, posting::PostingStore, version::VersionStore, XrefStore},
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

const ALL_CFS: [&str; 14] = [
    "variables",
    "blobs",
    "hashes",
    "filenames",
    "versions",
    "definitions",
    "definitions-cache-C",
    "definitions-cache-K",
    "definitions-cache-D",
    "definitions-cache-M",
    "references",
    "doccomments",
    "compatibledts",
    "compatibledts_docs",
];

fn dump(store: &XrefStore) -> BTreeMap<(String, Vec<u8>), Vec<u8>> {
    let mut out = BTreeMap::new();
    for cf in ALL_CFS {
        for item in store.iter_raw(cf) {
            let (key, value) = item.unwrap();
            out.insert((cf.to_string(), key.to_vec()), value.to_vec());
        }
    }
    out
}

/// One tag, one C blob defining `foo` and referencing undefined `bar`
#[test]
fn single_blob_corpus() -> anyhow::Result<()> {
    let before_bar = "\u{1}".repeat(11);
    let fx = FixtureBuilder::new()
        .tag("v1.0", &[("a1a1", "/src/a.c")])
        .defs("a1a1", &["foo f 10"])
        .tokens("a1a1", &[&before_bar, "bar", ";\u{1}"])
        .build("pipeline-single-blob")?;
    fx.update()?;

    let store = fx.open_store()?;
    assert_eq!(store.num_blobs()?, 1);
    assert_eq!(store.blob_id("a1a1")?, Some(0));
    assert_eq!(store.blob_hash(0)?.as_deref(), Some("a1a1"));
    assert_eq!(store.blob_filename(0)?.as_deref(), Some("a.c"));

    let paths = store.version("v1.0")?.unwrap();
    let entries: Vec<(u32, &str)> = paths.iter().map(|e| (e.idx, e.path.as_str())).collect();
    assert_eq!(entries, vec![(0, "/src/a.c")]);

    let defs = store.def_list(b"foo")?.unwrap();
    assert_eq!(
        defs.iter().collect::<Vec<_>>(),
        vec![DefEntry {
            idx: 0,
            kind: DefKind::Function,
            line: 10,
            family: Family::C,
        }]
    );

    // bar has no definition anywhere, so its reference is dropped
    assert!(store.ref_list(b"bar")?.is_none());
    assert!(store.ref_list(b"foo")?.is_none());
    Ok(())
}

/// A Kconfig symbol, a C file and a Makefile referencing it, plus a
/// blacklisted token and a C macro visible from a later tag
fn two_tag_fixture(prefix: &str) -> anyhow::Result<crate::helpers::Fixture> {
    FixtureBuilder::new()
        .tag(
            "v1.0",
            &[
                ("k1k1", "/Kconfig"),
                ("c1c1", "/src/a.c"),
                ("m1m1", "/Makefile"),
            ],
        )
        .tag(
            "v2.0",
            &[
                ("k1k1", "/Kconfig"),
                ("c1c1", "/src/a.c"),
                ("m1m1", "/Makefile"),
                ("c2c2", "/src/w.c"),
                ("d1d1", "/src/board.dts"),
            ],
        )
        .defs("k1k1", &["FOO c 5", "NETDEV c 7"])
        .tokens("k1k1", &["config ", "FOO", "\u{1}config ", "NETDEV", "\u{1}"])
        .defs("c1c1", &["foo f 10", "widget s 20", "i v 3"])
        .tokens(
            "c1c1",
            &[
                "int ",
                "foo",
                " = ",
                "bar",
                ";\u{1}#ifdef\u{1}",
                "CONFIG_FOO",
                "\u{1}for (",
                "i",
                ") {}\u{1}",
            ],
        )
        .docs("c1c1", &["foo 15"])
        .tokens(
            "m1m1",
            &["obj-$(", "CONFIG_FOO", ") += ", "foo", ".o\u{1}"],
        )
        .defs("c2c2", &["WSIZE M 3", "foo f 30"])
        .tokens("c2c2", &["#define ", "WSIZE", " 4\u{1}"])
        .tokens("d1d1", &["size = <", "WSIZE", ">;\u{1}"])
        .build(prefix)
}

#[test]
fn path_lists_are_ordered_and_bounded() -> anyhow::Result<()> {
    let fx = two_tag_fixture("pipeline-path-lists")?;
    fx.update()?;

    let store = fx.open_store()?;
    let num_blobs = store.num_blobs()?;
    assert_eq!(num_blobs, 5);

    for tag in ["v1.0", "v2.0"] {
        let ids: Vec<u32> = store.version(tag)?.unwrap().iter().map(|e| e.idx).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted, "ids of {tag} strictly increasing and unique");
        assert!(ids.iter().all(|&idx| idx < num_blobs));
    }
    Ok(())
}

#[test]
fn kconfig_symbols_are_prefixed_and_referenced() -> anyhow::Result<()> {
    let fx = two_tag_fixture("pipeline-kconfig")?;
    fx.update()?;

    let store = fx.open_store()?;
    // stored under CONFIG_, not the bare name
    assert!(store.def_list(b"FOO")?.is_none());
    let defs = store.def_list(b"CONFIG_FOO")?.unwrap();
    assert_eq!(defs.families(), &[Family::K]);

    let refs = store.ref_list(b"CONFIG_FOO")?.unwrap();
    let by_blob: Vec<(u32, Family)> = refs.iter().map(|e| (e.idx, e.family)).collect();
    // Kconfig itself (id 0), a.c (id 1) and the Makefile (id 2)
    assert_eq!(
        by_blob,
        vec![(0, Family::K), (1, Family::C), (2, Family::M)]
    );

    // makefiles only index CONFIG_ tokens: `foo` appears in the
    // Makefile's token stream but only a.c may reference it
    let foo_refs = store.ref_list(b"foo")?.unwrap();
    assert!(foo_refs.iter().all(|e| e.idx != 2));
    Ok(())
}

#[test]
fn references_require_a_definition() -> anyhow::Result<()> {
    let fx = two_tag_fixture("pipeline-refs-oracle")?;
    fx.update()?;

    let store = fx.open_store()?;
    assert!(store.ref_list(b"bar")?.is_none());

    for item in store.iter_raw("references") {
        let (key, _) = item?;
        assert!(
            store.def_list(&key)?.is_some(),
            "reference key {:?} lacks a definition",
            String::from_utf8_lossy(&key)
        );
    }
    Ok(())
}

#[test]
fn blacklisted_tokens_never_get_indexed() -> anyhow::Result<()> {
    let fx = two_tag_fixture("pipeline-blacklist")?;
    fx.update()?;

    let store = fx.open_store()?;
    assert!(store.def_list(b"i")?.is_none());
    assert!(store.ref_list(b"i")?.is_none());
    Ok(())
}

#[test]
fn defs_caches_match_the_compatibility_rule() -> anyhow::Result<()> {
    let fx = two_tag_fixture("pipeline-defs-cache")?;
    fx.update()?;

    let store = fx.open_store()?;
    for item in store.iter_raw("definitions") {
        let (key, value) = item?;
        let list = DefList::parse(&value)?;
        let macros = list.get_macros();
        for family in CACHED_DEF_FAMILIES {
            let expected = compatible_family(list.families(), family)
                || compatible_macro(&macros, family);
            assert_eq!(
                store.defs_cache_contains(family, &key)?,
                expected,
                "cache {family} membership of {:?}",
                String::from_utf8_lossy(&key)
            );
        }
    }

    // spot checks: the C macro satisfies a DTS request, nothing else does
    assert!(store.defs_cache_contains(Family::D, b"WSIZE")?);
    assert!(!store.defs_cache_contains(Family::D, b"foo")?);
    assert!(store.defs_cache_contains(Family::K, b"CONFIG_FOO")?);
    assert!(!store.defs_cache_contains(Family::K, b"foo")?);
    Ok(())
}

#[test]
fn reindexing_is_idempotent() -> anyhow::Result<()> {
    let fx = two_tag_fixture("pipeline-idempotent")?;
    fx.update()?;
    let first = dump(&fx.open_store()?);

    fx.update()?;
    let second = dump(&fx.open_store()?);
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn compatible_strings_are_indexed_per_family() -> anyhow::Result<()> {
    let fx = FixtureBuilder::new()
        .dts_comp(true)
        .tag(
            "v1.0",
            &[
                ("cc11", "/drivers/widget.c"),
                ("dd11", "/arch/boot/dts/board.dts"),
                ("bb11", "/Documentation/devicetree/bindings/vendor-dev.yaml"),
            ],
        )
        .content(
            "cc11",
            "static const struct of_device_id ids[] = {\n\t{ .compatible = \"vendor,dev\" },\n};\n",
        )
        .content("dd11", "node {\n\tcompatible = \"vendor,dev\";\n};\n")
        .content("bb11", "title: vendor device\nselect: vendor,dev\n")
        .build("pipeline-compatibles")?;
    fx.update()?;

    let store = fx.open_store()?;
    let comps = store.comp_list(b"vendor%2Cdev")?.unwrap();
    let by_blob: Vec<(u32, Family)> = comps.iter().map(|e| (e.idx, e.family)).collect();
    assert_eq!(by_blob, vec![(0, Family::C), (1, Family::D)]);

    let docs = store.comp_doc_list(b"vendor%2Cdev")?.unwrap();
    let by_blob: Vec<(u32, Family)> = docs.iter().map(|e| (e.idx, e.family)).collect();
    assert_eq!(by_blob, vec![(2, Family::B)]);
    Ok(())
}

#[test]
fn compatible_docs_require_a_code_occurrence() -> anyhow::Result<()> {
    // the binding doc mentions a string no code defines
    let fx = FixtureBuilder::new()
        .dts_comp(true)
        .tag(
            "v1.0",
            &[("bb22", "/Documentation/devicetree/bindings/ghost.yaml")],
        )
        .content("bb22", "select: ghost,dev\n")
        .build("pipeline-comps-oracle")?;
    fx.update()?;

    let store = fx.open_store()?;
    assert!(store.comp_doc_list(b"ghost%2Cdev")?.is_none());
    Ok(())
}
