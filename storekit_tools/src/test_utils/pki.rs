//! A throwaway three-level PKI that mirrors the shape of the App Store signing chain: a P-384 root, a P-256
//! intermediate and a P-256 leaf that signs ES256 payloads.
//!
//! Two fixtures built with the default builder share subject names but not keys, which makes it easy to splice
//! certificates from one chain into another.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};
use p256::{
    ecdsa::{signature::Signer, Signature, SigningKey},
    pkcs8::DecodePrivateKey,
};
use rcgen::{
    date_time_ymd,
    BasicConstraints,
    Certificate,
    CertificateParams,
    DistinguishedName,
    DnType,
    IsCa,
    KeyPair,
    KeyUsagePurpose,
    SignatureAlgorithm,
    PKCS_ECDSA_P256_SHA256,
    PKCS_ECDSA_P384_SHA384,
};
use serde::Serialize;

pub type Ymd = (i32, u8, u8);

pub const VALID_FROM: Ymd = (2020, 1, 1);
pub const VALID_UNTIL: Ymd = (2040, 1, 1);

/// A freshly generated P-256 PKCS#8 PEM key, like the `.p8` files App Store Connect hands out.
pub fn api_key_pem() -> (String, KeyPair) {
    let pair = KeyPair::generate().expect("key generation should succeed");
    (pair.serialize_pem(), pair)
}

pub struct TestPkiBuilder {
    leaf_from: Ymd,
    leaf_until: Ymd,
    leaf_algorithm: &'static SignatureAlgorithm,
    root_constraints: BasicConstraints,
    intermediate_ca: IsCa,
    intermediate_key_usages: Vec<KeyUsagePurpose>,
}

impl Default for TestPkiBuilder {
    fn default() -> Self {
        Self {
            leaf_from: VALID_FROM,
            leaf_until: VALID_UNTIL,
            leaf_algorithm: &PKCS_ECDSA_P256_SHA256,
            root_constraints: BasicConstraints::Unconstrained,
            intermediate_ca: IsCa::Ca(BasicConstraints::Unconstrained),
            intermediate_key_usages: Vec::new(),
        }
    }
}

impl TestPkiBuilder {
    pub fn leaf_validity(mut self, from: Ymd, until: Ymd) -> Self {
        self.leaf_from = from;
        self.leaf_until = until;
        self
    }

    pub fn leaf_algorithm(mut self, alg: &'static SignatureAlgorithm) -> Self {
        self.leaf_algorithm = alg;
        self
    }

    pub fn root_constraints(mut self, constraints: BasicConstraints) -> Self {
        self.root_constraints = constraints;
        self
    }

    /// Lets the intermediate be something other than a CA. It still signs the leaf.
    pub fn intermediate_ca(mut self, is_ca: IsCa) -> Self {
        self.intermediate_ca = is_ca;
        self
    }

    /// Adds a keyUsage extension with these purposes to the intermediate.
    pub fn intermediate_key_usages(mut self, usages: Vec<KeyUsagePurpose>) -> Self {
        self.intermediate_key_usages = usages;
        self
    }

    pub fn build(self) -> TestPki {
        let root_key = KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384).expect("root key");
        let root = ca_params("StoreKit Test Root CA", IsCa::Ca(self.root_constraints))
            .self_signed(&root_key)
            .expect("root self-signing should succeed");

        let intermediate_key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).expect("intermediate key");
        let mut intermediate_params = ca_params("StoreKit Test Intermediate CA", self.intermediate_ca);
        intermediate_params.key_usages = self.intermediate_key_usages;
        let intermediate = intermediate_params
            .signed_by(&intermediate_key, &root, &root_key)
            .expect("intermediate signing should succeed");

        let leaf_key = KeyPair::generate_for(self.leaf_algorithm).expect("leaf key");
        let mut leaf_params = CertificateParams::default();
        leaf_params.distinguished_name = name("StoreKit Test Signing Leaf");
        leaf_params.not_before = date_time_ymd(self.leaf_from.0, self.leaf_from.1, self.leaf_from.2);
        leaf_params.not_after = date_time_ymd(self.leaf_until.0, self.leaf_until.1, self.leaf_until.2);
        let leaf = leaf_params.signed_by(&leaf_key, &intermediate, &intermediate_key).expect("leaf signing");

        TestPki { root, root_key, intermediate, intermediate_key, leaf, leaf_key }
    }
}

pub struct TestPki {
    pub root: Certificate,
    pub root_key: KeyPair,
    pub intermediate: Certificate,
    pub intermediate_key: KeyPair,
    pub leaf: Certificate,
    pub leaf_key: KeyPair,
}

impl TestPki {
    pub fn generate() -> Self {
        TestPkiBuilder::default().build()
    }

    pub fn builder() -> TestPkiBuilder {
        TestPkiBuilder::default()
    }

    pub fn root_der(&self) -> Vec<u8> {
        self.root.der().to_vec()
    }

    /// DER certificates, leaf first
    pub fn chain(&self) -> Vec<Vec<u8>> {
        vec![self.leaf.der().to_vec(), self.intermediate.der().to_vec(), self.root.der().to_vec()]
    }

    /// Signs `claims` with the leaf key and embeds this fixture's own chain.
    pub fn sign_payload<T: Serialize>(&self, claims: &T) -> String {
        self.sign_payload_with_chain(claims, &self.chain())
    }

    /// Signs `claims` with the leaf key but embeds an arbitrary chain.
    pub fn sign_payload_with_chain<T: Serialize>(&self, claims: &T, chain: &[Vec<u8>]) -> String {
        let header = serde_json::json!({ "alg": "ES256", "x5c": x5c(chain) });
        let signing_input = signing_input(&header, claims);
        let key = SigningKey::from_pkcs8_der(&self.leaf_key.serialize_der()).expect("leaf key must be P-256");
        let signature: Signature = key.sign(signing_input.as_bytes());
        format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes()))
    }
}

/// Builds a compact JWS from raw parts without signing anything.
pub fn unsigned_payload<T: Serialize>(header: &serde_json::Value, claims: &T, signature: &[u8]) -> String {
    format!("{}.{}", signing_input(header, claims), URL_SAFE_NO_PAD.encode(signature))
}

pub fn x5c(chain: &[Vec<u8>]) -> Vec<String> {
    chain.iter().map(|der| STANDARD.encode(der)).collect()
}

fn signing_input<T: Serialize>(header: &serde_json::Value, claims: &T) -> String {
    let header = serde_json::to_vec(header).expect("header serializes");
    let claims = serde_json::to_vec(claims).expect("claims serialize");
    format!("{}.{}", URL_SAFE_NO_PAD.encode(header), URL_SAFE_NO_PAD.encode(claims))
}

fn name(common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::OrganizationName, "StoreKit Test Authority");
    dn.push(DnType::CommonName, common_name);
    dn
}

fn ca_params(common_name: &str, is_ca: IsCa) -> CertificateParams {
    let mut params = CertificateParams::default();
    params.distinguished_name = name(common_name);
    params.is_ca = is_ca;
    params.not_before = date_time_ymd(VALID_FROM.0, VALID_FROM.1, VALID_FROM.2);
    params.not_after = date_time_ymd(VALID_UNTIL.0, VALID_UNTIL.1, VALID_UNTIL.2);
    params
}
