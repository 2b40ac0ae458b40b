pub mod extractor;
pub mod keys;

#[cfg(test)]
pub(crate) mod test_support;

pub use extractor::JwtTokenExtractor;
pub use keys::KeyStore;
