use crate::helpers::{Fixture, FixtureBuilder};
use elixir_indexer::family::Family;
use pretty_assertions::assert_eq;

/// The same a.c path defines `foo` at different lines under two tags
fn per_tag_fixture() -> anyhow::Result<Fixture> {
    FixtureBuilder::new()
        .tag("v1.0", &[("f1f1", "/a.c")])
        .tag("v2.0", &[("f2f2", "/a.c")])
        .defs("f1f1", &["foo f 10"])
        .defs("f2f2", &["foo f 20"])
        .build("query-per-tag")
}

#[test]
fn definitions_are_scoped_to_the_tag() -> anyhow::Result<()> {
    let fx = per_tag_fixture()?;
    fx.update()?;
    let query = fx.query()?;

    let v1 = query.search_ident("v1.0", "foo", Family::A)?;
    assert_eq!(v1.definitions.len(), 1);
    assert_eq!(v1.definitions[0].path, "/a.c");
    assert_eq!(v1.definitions[0].lines, "10");
    assert_eq!(v1.definitions[0].kind, Some("function"));

    let v2 = query.search_ident("v2.0", "foo", Family::A)?;
    assert_eq!(v2.definitions.len(), 1);
    assert_eq!(v2.definitions[0].lines, "20");
    Ok(())
}

#[test]
fn missing_tag_or_ident_yields_empty_results() -> anyhow::Result<()> {
    let fx = per_tag_fixture()?;
    fx.update()?;
    let query = fx.query()?;

    assert!(query.search_ident("v9.9", "foo", Family::A)?.is_empty());
    assert!(query.search_ident("v1.0", "nothing", Family::A)?.is_empty());
    Ok(())
}

fn family_fixture(prefix: &str) -> anyhow::Result<Fixture> {
    FixtureBuilder::new()
        .tag(
            "v1.0",
            &[
                ("kk10", "/Kconfig"),
                ("cc10", "/src/a.c"),
                ("ww10", "/src/w.c"),
                ("dd10", "/src/board.dts"),
            ],
        )
        .defs("kk10", &["FOO c 5"])
        .defs("cc10", &["widget s 20", "widget f 40"])
        .tokens("cc10", &["#ifdef ", "CONFIG_FOO", "\u{1}"])
        .docs("cc10", &["widget 18"])
        .defs("ww10", &["WSIZE M 3"])
        .tokens("dd10", &["size = <", "WSIZE", ">;\u{1}"])
        .build(prefix)
}

#[test]
fn family_filtering_matches_stored_kinds() -> anyhow::Result<()> {
    let fx = family_fixture("query-families")?;
    fx.update()?;
    let query = fx.query()?;

    // A returns every stored kind, clustered most-specific first
    let all = query.search_ident("v1.0", "widget", Family::A)?;
    let kinds: Vec<&str> = all.definitions.iter().filter_map(|d| d.kind).collect();
    assert_eq!(kinds, vec!["struct", "function"]);

    // the Kconfig definition satisfies C requests but not vice versa
    let c = query.search_ident("v1.0", "CONFIG_FOO", Family::C)?;
    assert!(c.definitions.is_empty());
    assert_eq!(c.references.len(), 1);
    assert_eq!(c.references[0].path, "/src/a.c");

    let k = query.search_ident("v1.0", "CONFIG_FOO", Family::K)?;
    assert_eq!(k.definitions.len(), 1);
    assert_eq!(k.definitions[0].path, "/Kconfig");
    assert_eq!(k.definitions[0].lines, "5");
    // a C-file reference still satisfies the K request
    assert_eq!(k.references.len(), 1);
    Ok(())
}

#[test]
fn macro_definitions_satisfy_dts_requests() -> anyhow::Result<()> {
    let fx = family_fixture("query-macro-rule")?;
    fx.update()?;
    let query = fx.query()?;

    let d = query.search_ident("v1.0", "WSIZE", Family::D)?;
    assert_eq!(d.definitions.len(), 1);
    assert_eq!(d.definitions[0].path, "/src/w.c");
    assert_eq!(d.references.len(), 1);
    assert_eq!(d.references[0].path, "/src/board.dts");

    // a plain struct never satisfies a DTS request
    let widget = query.search_ident("v1.0", "widget", Family::D)?;
    assert!(widget.definitions.is_empty());
    Ok(())
}

#[test]
fn doc_comments_ignore_the_requested_family() -> anyhow::Result<()> {
    let fx = family_fixture("query-docs-unfiltered")?;
    fx.update()?;
    let query = fx.query()?;

    for family in [Family::A, Family::C, Family::D, Family::K] {
        let results = query.search_ident("v1.0", "widget", family)?;
        assert_eq!(results.doc_comments.len(), 1, "docs under family {family}");
        assert_eq!(results.doc_comments[0].lines, "18");
    }
    Ok(())
}

#[test]
fn compatible_lookup_by_family_b() -> anyhow::Result<()> {
    let fx = FixtureBuilder::new()
        .dts_comp(true)
        .tag(
            "v1.0",
            &[
                ("cc20", "/drivers/widget.c"),
                ("dd20", "/arch/boot/dts/board.dts"),
                ("bb20", "/Documentation/devicetree/bindings/vendor-dev.yaml"),
            ],
        )
        .content("cc20", "{ .compatible = \"vendor,dev\" },\n")
        .content("dd20", "compatible = \"vendor,dev\";\n")
        .content("bb20", "select: vendor,dev\n")
        .build("query-compatible")?;
    fx.update()?;
    let query = fx.query()?;

    let results = query.search_ident("v1.0", "vendor,dev", Family::B)?;
    assert_eq!(results.definitions.len(), 1);
    assert_eq!(results.definitions[0].path, "/drivers/widget.c");
    assert_eq!(results.definitions[0].kind, Some("compatible"));
    assert_eq!(results.references.len(), 1);
    assert_eq!(results.references[0].path, "/arch/boot/dts/board.dts");
    assert_eq!(results.doc_comments.len(), 1);
    assert_eq!(
        results.doc_comments[0].path,
        "/Documentation/devicetree/bindings/vendor-dev.yaml"
    );

    assert!(query.dts_comp_exists("vendor,dev")?);
    assert!(!query.dts_comp_exists("other,dev")?);
    Ok(())
}

#[test]
fn autocomplete_walks_the_prefix_range() -> anyhow::Result<()> {
    let symbols: Vec<String> = (b'a'..=b'm').map(|c| format!("NE{}", c as char)).collect();
    let mut defs: Vec<String> = symbols.iter().map(|s| format!("{s} c 1")).collect();
    defs.push("NFS c 1".to_string());
    let defs: Vec<&str> = defs.iter().map(String::as_str).collect();

    let fx = FixtureBuilder::new()
        .tag("v1.0", &[("kk30", "/Kconfig")])
        .defs("kk30", &defs)
        .build("query-autocomplete")?;
    fx.update()?;
    let query = fx.query()?;

    let completions = query.autocomplete("CONFIG_NE", Family::C)?;
    assert_eq!(completions.len(), 10);
    assert!(completions.iter().all(|c| c.starts_with("CONFIG_NE")));
    let mut sorted = completions.clone();
    sorted.sort();
    assert_eq!(completions, sorted, "byte-lexicographic order");
    // the walk starts at the smallest key >= the prefix
    assert_eq!(completions[0], "CONFIG_NEa");

    // a prefix past every key yields nothing
    assert!(query.autocomplete("CONFIG_Z", Family::C)?.is_empty());
    Ok(())
}

#[test]
fn latest_prefers_indexed_tags() -> anyhow::Result<()> {
    let fx = per_tag_fixture()?;

    // nothing indexed yet: fall back to the stream's last line
    drop(fx.open_store()?);
    assert_eq!(fx.query()?.latest()?, "v1.0");

    fx.update()?;
    assert_eq!(fx.query()?.latest()?, "v2.0");
    Ok(())
}

#[test]
fn file_existence_is_memoized_per_tag() -> anyhow::Result<()> {
    let fx = per_tag_fixture()?;
    fx.update()?;
    let query = fx.query()?;

    assert!(query.file_exists("v1.0", "/a.c")?);
    assert!(!query.file_exists("v1.0", "/b.c")?);
    assert!(!query.file_exists("v9.9", "/a.c")?);
    Ok(())
}

#[test]
fn tokenized_files_mark_known_identifiers() -> anyhow::Result<()> {
    let fx = FixtureBuilder::new()
        .tag("v1.0", &[("cc40", "/src/a.c"), ("rr40", "/README")])
        .defs("cc40", &["foo f 1"])
        .tokens("cc40", &["int ", "foo", "(", "bar", ");\u{1}"])
        .content("rr40", "plain text\n")
        .build("query-tokenized")?;
    fx.update()?;
    let query = fx.query()?;

    let marked = query.get_tokenized_file("v1.0", "/src/a.c")?;
    let marked = String::from_utf8(marked)?;
    assert_eq!(marked, "int \u{1b}[31mfoo\u{1b}[0m(bar);\n");

    // families without a definitions cache pass through untouched
    let raw = query.get_tokenized_file("v1.0", "/README")?;
    assert_eq!(raw, b"plain text\n");
    Ok(())
}

#[test]
fn versions_lists_only_indexed_tags() -> anyhow::Result<()> {
    let fx = per_tag_fixture()?;
    fx.update()?;
    let query = fx.query()?;

    let tags: Vec<String> = query.versions()?.into_iter().map(|v| v.tag).collect();
    assert_eq!(tags, vec!["v1.0", "v2.0"]);
    Ok(())
}

#[test]
fn stats_count_the_maps() -> anyhow::Result<()> {
    let fx = per_tag_fixture()?;
    fx.update()?;
    let query = fx.query()?;

    let stats = query.stats();
    assert_eq!(stats.versions, 2);
    assert_eq!(stats.blobs, 2);
    assert_eq!(stats.blobs, stats.hashes);
    assert_eq!(stats.hashes, stats.filenames);
    assert_eq!(stats.definitions, 1);
    Ok(())
}
