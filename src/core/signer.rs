use super::error::NfeError;

/// Opaque digital-signature gateway.
///
/// The pipeline hands a generated XML document and a tenant identifier to
/// this trait and gets back the signed document. Certificate storage and
/// the signature algorithm live behind the implementation — a local
/// certificate store, a remote signing appliance, or a test double are all
/// interchangeable here.
pub trait Signer: Send + Sync {
    /// Sign `xml` with the certificate configured for `tenant_id`.
    ///
    /// Fails with [`NfeError::Signing`] when no usable certificate exists
    /// for the tenant or the certificate is expired.
    fn sign(&self, xml: &str, tenant_id: u32) -> Result<String, NfeError>;
}
