//! TLS assets: signers, signed client certificates and CA bundles
//!
//! Each asset type is generic over a profile that fixes its identity (key
//! variant, subject, file names). Keys and certificates are issued through
//! the injected [`CertIssuer`]; [`RcgenIssuer`] is the default.
//!
//! ```text
//! SignerCertKey<EtcdSigner> ──> SignedCertKey<EtcdSignerClient>
//!                          └──> CaBundle<EtcdCa>
//! ```

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use forge_asset::{
    async_trait, Asset, AssetFile, AssetKey, FileFetcher, GenerateContext, GenerateError,
    LoadError, Parents, WritableAsset,
};
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, DnValue, ExtendedKeyUsagePurpose,
    IsCa, Issuer, KeyPair, KeyUsagePurpose,
};
use serde::{Deserialize, Serialize};

/// Directory TLS files are written to
pub const TLS_DIR: &str = "tls";

/// Certificate subject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    /// Common name
    pub common_name: &'static str,
    /// Organizational unit
    pub organizational_unit: &'static str,
}

/// A PEM certificate and its PEM private key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertKey {
    /// Certificate, PEM
    pub cert_pem: String,
    /// Private key, PEM
    pub key_pem: String,
}

/// Errors issuing certificates
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    /// Key pair generation failed
    #[error("failed to generate key: {0}")]
    KeyGeneration(String),

    /// Certificate could not be built or signed
    #[error("failed to create certificate: {0}")]
    Certificate(String),

    /// Signer material could not be parsed
    #[error("invalid signer: {0}")]
    Signer(String),
}

impl From<IssueError> for GenerateError {
    fn from(e: IssueError) -> Self {
        GenerateError::external("failed to issue certificate", e)
    }
}

/// Issues keys and certificates
///
/// Registered in [`forge_asset::Services`] as `Arc<dyn CertIssuer>`.
pub trait CertIssuer: Send + Sync {
    /// Self-signed CA certificate
    ///
    /// # Errors
    /// Returns [`IssueError`] when key generation or signing fails.
    fn self_signed(&self, subject: &Subject) -> Result<CertKey, IssueError>;

    /// Client certificate signed by `signer`
    ///
    /// # Errors
    /// Returns [`IssueError`] when the signer is unusable or signing fails.
    fn signed_client(&self, subject: &Subject, signer: &CertKey) -> Result<CertKey, IssueError>;
}

/// [`CertIssuer`] backed by rcgen
#[derive(Debug, Clone, Copy, Default)]
pub struct RcgenIssuer;

fn distinguished_name(subject: &Subject) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(
        DnType::CommonName,
        DnValue::Utf8String(subject.common_name.to_string()),
    );
    dn.push(
        DnType::OrganizationalUnitName,
        DnValue::Utf8String(subject.organizational_unit.to_string()),
    );
    dn
}

impl CertIssuer for RcgenIssuer {
    fn self_signed(&self, subject: &Subject) -> Result<CertKey, IssueError> {
        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name(subject);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];

        let key_pair = KeyPair::generate().map_err(|e| IssueError::KeyGeneration(e.to_string()))?;
        let cert = params
            .self_signed(&key_pair)
            .map_err(|e| IssueError::Certificate(e.to_string()))?;

        Ok(CertKey {
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
        })
    }

    fn signed_client(&self, subject: &Subject, signer: &CertKey) -> Result<CertKey, IssueError> {
        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name(subject);
        params.is_ca = IsCa::NoCa;
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];

        let signer_key =
            KeyPair::from_pem(&signer.key_pem).map_err(|e| IssueError::Signer(e.to_string()))?;
        let issuer = Issuer::from_ca_cert_pem(&signer.cert_pem, &signer_key)
            .map_err(|e| IssueError::Signer(e.to_string()))?;

        let key_pair = KeyPair::generate().map_err(|e| IssueError::KeyGeneration(e.to_string()))?;
        let cert = params
            .signed_by(&key_pair, &issuer)
            .map_err(|e| IssueError::Certificate(e.to_string()))?;

        Ok(CertKey {
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
        })
    }
}

/// Identity of one TLS asset instance
pub trait Profile: Debug + Default + Clone + PartialEq + Send + Sync + 'static {
    /// Key variant
    const ID: &'static str;
    /// Human readable asset name
    const NAME: &'static str;
    /// File stem beneath [`TLS_DIR`]
    const FILE_STEM: &'static str;
    /// Certificate subject
    const SUBJECT: Subject;
}

/// Profile of a certificate signed by another profile's signer
pub trait SignedProfile: Profile {
    /// Signing CA profile
    type Signer: Profile;
}

/// Profile of a CA bundle built from one signer
pub trait BundleProfile: Profile {
    /// Bundled CA profile
    type Signer: Profile;
}

fn cert_path<P: Profile>() -> String {
    format!("{TLS_DIR}/{}.crt", P::FILE_STEM)
}

fn key_path<P: Profile>() -> String {
    format!("{TLS_DIR}/{}.key", P::FILE_STEM)
}

fn load_pair<P: Profile>(fetcher: &dyn FileFetcher) -> Result<Option<CertKey>, LoadError> {
    let (cert_name, key_name) = (cert_path::<P>(), key_path::<P>());
    let (Some(cert), Some(key)) = (fetcher.fetch_by_name(&cert_name)?, fetcher.fetch_by_name(&key_name)?)
    else {
        return Ok(None);
    };
    let cert_pem = String::from_utf8(cert.data).map_err(|e| LoadError::parse(cert_name, e))?;
    let key_pem = String::from_utf8(key.data).map_err(|e| LoadError::parse(key_name, e))?;
    Ok(Some(CertKey { cert_pem, key_pem }))
}

fn pair_files<P: Profile>(pair: &CertKey) -> Vec<AssetFile> {
    if pair.cert_pem.is_empty() {
        return Vec::new();
    }
    vec![
        AssetFile::new(key_path::<P>(), pair.key_pem.as_bytes()),
        AssetFile::new(cert_path::<P>(), pair.cert_pem.as_bytes()),
    ]
}

fn issuer(ctx: &GenerateContext) -> Result<&Arc<dyn CertIssuer>, GenerateError> {
    ctx.service::<Arc<dyn CertIssuer>>()
}

/// Self-signed CA key and certificate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignerCertKey<P: Profile> {
    /// Issued material
    #[serde(flatten)]
    pub pair: CertKey,
    #[serde(skip)]
    profile: PhantomData<P>,
}

#[async_trait]
impl<P: Profile> Asset for SignerCertKey<P> {
    const KEY: AssetKey = AssetKey::with_variant("tls.SignerCertKey", P::ID);

    fn name(&self) -> &'static str {
        P::NAME
    }

    async fn generate(&mut self, _: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
        self.pair = issuer(ctx)?.self_signed(&P::SUBJECT)?;
        Ok(())
    }
}

impl<P: Profile> WritableAsset for SignerCertKey<P> {
    fn files(&self) -> Vec<AssetFile> {
        pair_files::<P>(&self.pair)
    }

    fn load(&mut self, fetcher: &dyn FileFetcher) -> Result<bool, LoadError> {
        let Some(pair) = load_pair::<P>(fetcher)? else {
            return Ok(false);
        };
        self.pair = pair;
        Ok(true)
    }
}

/// Client key and certificate signed by `P::Signer`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignedCertKey<P: SignedProfile> {
    /// Issued material
    #[serde(flatten)]
    pub pair: CertKey,
    #[serde(skip)]
    profile: PhantomData<P>,
}

#[async_trait]
impl<P: SignedProfile> Asset for SignedCertKey<P> {
    const KEY: AssetKey = AssetKey::with_variant("tls.SignedCertKey", P::ID);

    fn name(&self) -> &'static str {
        P::NAME
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        vec![SignerCertKey::<P::Signer>::KEY]
    }

    async fn generate(&mut self, parents: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
        let signer = parents.get::<SignerCertKey<P::Signer>>()?;
        self.pair = issuer(ctx)?.signed_client(&P::SUBJECT, &signer.pair)?;
        Ok(())
    }
}

impl<P: SignedProfile> WritableAsset for SignedCertKey<P> {
    fn files(&self) -> Vec<AssetFile> {
        pair_files::<P>(&self.pair)
    }

    fn load(&mut self, fetcher: &dyn FileFetcher) -> Result<bool, LoadError> {
        let Some(pair) = load_pair::<P>(fetcher)? else {
            return Ok(false);
        };
        self.pair = pair;
        Ok(true)
    }
}

/// PEM bundle of trusted CA certificates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaBundle<P: BundleProfile> {
    /// Concatenated certificates
    pub bundle_pem: String,
    #[serde(skip)]
    profile: PhantomData<P>,
}

#[async_trait]
impl<P: BundleProfile> Asset for CaBundle<P> {
    const KEY: AssetKey = AssetKey::with_variant("tls.CaBundle", P::ID);

    fn name(&self) -> &'static str {
        P::NAME
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        vec![SignerCertKey::<P::Signer>::KEY]
    }

    async fn generate(&mut self, parents: &Parents, _: &GenerateContext) -> Result<(), GenerateError> {
        let signer = parents.get::<SignerCertKey<P::Signer>>()?;
        let mut bundle = signer.pair.cert_pem.clone();
        if !bundle.ends_with('\n') {
            bundle.push('\n');
        }
        self.bundle_pem = bundle;
        Ok(())
    }
}

impl<P: BundleProfile> WritableAsset for CaBundle<P> {
    fn files(&self) -> Vec<AssetFile> {
        if self.bundle_pem.is_empty() {
            return Vec::new();
        }
        vec![AssetFile::new(cert_path::<P>(), self.bundle_pem.as_bytes())]
    }

    fn load(&mut self, fetcher: &dyn FileFetcher) -> Result<bool, LoadError> {
        let name = cert_path::<P>();
        let Some(file) = fetcher.fetch_by_name(&name)? else {
            return Ok(false);
        };
        self.bundle_pem = String::from_utf8(file.data).map_err(|e| LoadError::parse(name, e))?;
        Ok(true)
    }
}

macro_rules! profile {
    ($(#[$doc:meta])* $name:ident, $id:literal, $display:literal, $stem:literal, $cn:literal, $ou:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl Profile for $name {
            const ID: &'static str = $id;
            const NAME: &'static str = $display;
            const FILE_STEM: &'static str = $stem;
            const SUBJECT: Subject = Subject {
                common_name: $cn,
                organizational_unit: $ou,
            };
        }
    };
}

profile!(
    /// etcd serving and peer CA
    EtcdSigner, "etcd-signer", "Certificate (etcd-signer)", "etcd-signer", "etcd-signer", "openshift"
);
profile!(
    /// Client of the etcd signer
    EtcdSignerClient, "etcd-signer-client", "Certificate (etcd)", "etcd-client", "etcd", "etcd"
);
profile!(
    /// etcd metrics CA
    EtcdMetricSigner, "etcd-metric-signer", "Certificate (etcd-metric-signer)", "etcd-metric-signer", "etcd-metric-signer", "openshift"
);
profile!(
    /// Client of the etcd metrics signer
    EtcdMetricSignerClient, "etcd-metric-signer-client", "Certificate (etcd-metric)", "etcd-metric-signer-client", "etcd-metric", "etcd-metric"
);
profile!(
    /// Trust bundle for etcd
    EtcdCa, "etcd-ca-bundle", "Certificate (etcd-ca-bundle)", "etcd-ca-bundle", "etcd-ca-bundle", "openshift"
);
profile!(
    /// Trust bundle for etcd metrics
    EtcdMetricCa, "etcd-metric-ca-bundle", "Certificate (etcd-metric-ca-bundle)", "etcd-metric-ca-bundle", "etcd-metric-ca-bundle", "openshift"
);

impl SignedProfile for EtcdSignerClient {
    type Signer = EtcdSigner;
}

impl SignedProfile for EtcdMetricSignerClient {
    type Signer = EtcdMetricSigner;
}

impl BundleProfile for EtcdCa {
    type Signer = EtcdSigner;
}

impl BundleProfile for EtcdMetricCa {
    type Signer = EtcdMetricSigner;
}

/// etcd CA
pub type EtcdSignerCertKey = SignerCertKey<EtcdSigner>;
/// etcd client certificate
pub type EtcdSignerClientCertKey = SignedCertKey<EtcdSignerClient>;
/// etcd metrics CA
pub type EtcdMetricSignerCertKey = SignerCertKey<EtcdMetricSigner>;
/// etcd metrics client certificate
pub type EtcdMetricSignerClientCertKey = SignedCertKey<EtcdMetricSignerClient>;
/// etcd CA bundle
pub type EtcdCaBundle = CaBundle<EtcdCa>;
/// etcd metrics CA bundle
pub type EtcdMetricCaBundle = CaBundle<EtcdMetricCa>;

#[cfg(test)]
mod tests {
    use super::*;
    use forge_asset::{MemoryFetcher, Services};

    fn ctx() -> GenerateContext {
        GenerateContext::new(Services::new().with::<Arc<dyn CertIssuer>>(Arc::new(RcgenIssuer)))
    }

    #[test]
    fn keys_are_distinct_per_profile() {
        assert_eq!(EtcdSignerCertKey::KEY.to_string(), "tls.SignerCertKey/etcd-signer");
        assert_ne!(EtcdSignerCertKey::KEY, EtcdMetricSignerCertKey::KEY);
        assert_eq!(
            EtcdSignerClientCertKey::default().dependencies(),
            vec![EtcdSignerCertKey::KEY]
        );
    }

    #[tokio::test]
    async fn rcgen_issues_signer_and_client() {
        let mut signer = EtcdSignerCertKey::default();
        signer.generate(&Parents::new("signer"), &ctx()).await.unwrap();
        assert!(signer.pair.cert_pem.starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(signer.pair.key_pem.contains("PRIVATE KEY"));

        let client = RcgenIssuer
            .signed_client(&EtcdSignerClient::SUBJECT, &signer.pair)
            .unwrap();
        assert_ne!(client.cert_pem, signer.pair.cert_pem);
        assert_ne!(client.key_pem, signer.pair.key_pem);

        let names: Vec<String> = signer.files().into_iter().map(|f| f.filename).collect();
        assert_eq!(names, vec!["tls/etcd-signer.key", "tls/etcd-signer.crt"]);
    }

    #[test]
    fn signed_client_rejects_garbage_signer() {
        let bogus = CertKey {
            cert_pem: "nope".to_string(),
            key_pem: "nope".to_string(),
        };
        let err = RcgenIssuer
            .signed_client(&EtcdSignerClient::SUBJECT, &bogus)
            .unwrap_err();
        assert!(matches!(err, IssueError::Signer(_)));
    }

    #[test]
    fn load_requires_both_files() {
        let mut signer = EtcdSignerCertKey::default();
        let half = MemoryFetcher::new().with_file("tls/etcd-signer.crt", "cert");
        assert!(!signer.load(&half).unwrap());

        let full = half.with_file("tls/etcd-signer.key", "key");
        assert!(signer.load(&full).unwrap());
        assert_eq!(signer.pair.key_pem, "key");
    }

    #[test]
    fn state_omits_profile_marker() {
        let bundle = EtcdCaBundle {
            bundle_pem: "pem\n".to_string(),
            profile: PhantomData,
        };
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json, serde_json::json!({"bundle_pem": "pem\n"}));
        assert_eq!(bundle.files()[0].filename, "tls/etcd-ca-bundle.crt");
    }
}
