pub(crate) mod store_roundtrip;
