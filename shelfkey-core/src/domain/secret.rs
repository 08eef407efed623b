//! Capability shared by every record that stores a catalog password

/// A stored entity holding a credential in one of two forms: a plaintext
/// field or an encrypted blob. Empty strings count as absent.
pub trait SecretBearing {
    /// Identifying label used when reporting failures (never the secret)
    fn label(&self) -> String;

    fn plaintext_secret(&self) -> Option<&str>;

    fn set_plaintext_secret(&mut self, value: Option<String>);

    fn encrypted_secret(&self) -> Option<&str>;

    fn set_encrypted_secret(&mut self, value: Option<String>);
}

/// Treat empty strings as missing values
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
