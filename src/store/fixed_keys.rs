pub trait FixedKeys {
    const NUM_BLOBS_KEY: &'static [u8] = "numBlobs".as_bytes();
    const STORE_VERSION_KEY: &'static [u8] = "storeVersion".as_bytes();
}

impl FixedKeys for crate::store::XrefStore {}
