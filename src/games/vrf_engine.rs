//! Provably fair randomness
//!
//! Draws are derived from schnorrkel signatures over `label:nonce`. Anyone
//! holding the public key and the recorded bundles can recompute every draw.

use crate::errors::FairnessError;
use crate::games::rng::RandomSource;
use schnorrkel::{context::SigningContext, Keypair, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

const VRF_SIGNING_CONTEXT: &[u8] = b"toncasino";

/// Bytes of VRF output consumed per draw
const DRAW_WIDTH: usize = 8;

/// Bundles a [`ProofLog`] keeps before dropping the oldest
pub const DEFAULT_PROOF_LOG_CAPACITY: usize = 4_096;

/// VRF bundle containing cryptographic proof
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VrfBundle {
    /// Hex-encoded VRF output (32 bytes)
    pub vrf_output: String,
    /// Hex-encoded VRF proof (64-byte schnorrkel signature)
    pub vrf_proof: String,
    /// Hex-encoded public key (32 bytes)
    pub public_key: String,
    /// Input message used for VRF
    pub input_message: String,
}

/// VRF-based outcome generator
pub struct VrfGameEngine {
    keypair: Arc<Keypair>,
}

impl VrfGameEngine {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Create a new VRF engine with a random keypair
    pub fn new_random() -> Self {
        use rand_core::OsRng;
        Self::new(Keypair::generate_with(OsRng))
    }

    /// Sign `label:nonce` and return output plus proof
    pub fn generate_outcome(&self, label: &str, nonce: u64) -> (VrfBundle, [u8; 32]) {
        let input_message = format!("{}:{}", label, nonce);
        let signature = self.sign(input_message.as_bytes());
        let output = output_from_signature(&signature.to_bytes());

        let bundle = VrfBundle {
            vrf_output: hex::encode(output),
            vrf_proof: hex::encode(signature.to_bytes()),
            public_key: hex::encode(self.keypair.public.to_bytes()),
            input_message,
        };
        (bundle, output)
    }

    fn sign(&self, message: &[u8]) -> Signature {
        let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
        self.keypair.sign(ctx.bytes(message))
    }

    /// Split a VRF output into unit-interval draws, in consumption order
    pub fn draws_from_output(output: &[u8]) -> Vec<f64> {
        output
            .chunks_exact(DRAW_WIDTH)
            .map(|chunk| {
                let mut word = [0u8; DRAW_WIDTH];
                word.copy_from_slice(chunk);
                unit_from_u64(u64::from_be_bytes(word))
            })
            .collect()
    }

    /// Verify a VRF proof (public verification function)
    pub fn verify_vrf_proof(bundle: &VrfBundle, expected_input: &str) -> Result<bool, FairnessError> {
        if bundle.input_message != expected_input {
            return Ok(false);
        }

        let vrf_output = decode("vrf_output", &bundle.vrf_output)?;
        let vrf_proof = decode("vrf_proof", &bundle.vrf_proof)?;
        let public_key_bytes = decode("public_key", &bundle.public_key)?;

        let public_key = PublicKey::from_bytes(&public_key_bytes)
            .map_err(|e| FairnessError::InvalidKey(format!("{:?}", e)))?;
        let signature_array: [u8; 64] = vrf_proof
            .try_into()
            .map_err(|_| FairnessError::InvalidSignature("signature must be 64 bytes".to_string()))?;
        let signature = Signature::from_bytes(&signature_array)
            .map_err(|e| FairnessError::InvalidSignature(format!("{:?}", e)))?;

        let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
        if public_key.verify(ctx.bytes(expected_input.as_bytes()), &signature).is_err() {
            return Ok(false);
        }

        Ok(output_from_signature(&signature_array).as_slice() == vrf_output.as_slice())
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.keypair.public.to_bytes())
    }
}

fn output_from_signature(signature: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(signature);
    hasher.finalize().into()
}

fn decode(field: &'static str, value: &str) -> Result<Vec<u8>, FairnessError> {
    hex::decode(value).map_err(|e| FairnessError::InvalidEncoding {
        field,
        reason: e.to_string(),
    })
}

/// Top 53 bits mapped onto `[0, 1)`
fn unit_from_u64(word: u64) -> f64 {
    (word >> 11) as f64 / (1u64 << 53) as f64
}

/// Shared handle to the bundles a [`VrfRandomSource`] has produced.
///
/// Bounded: once `capacity` bundles are held the oldest is dropped, so a
/// holder that needs every proof must drain with [`ProofLog::take`].
#[derive(Clone)]
pub struct ProofLog {
    bundles: Arc<Mutex<VecDeque<VrfBundle>>>,
    capacity: usize,
}

impl Default for ProofLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_PROOF_LOG_CAPACITY)
    }
}

impl ProofLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bundles: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    fn push(&self, bundle: VrfBundle) {
        if let Ok(mut bundles) = self.bundles.lock() {
            if bundles.len() == self.capacity {
                bundles.pop_front();
            }
            bundles.push_back(bundle);
        }
    }

    /// Drain every bundle recorded so far, oldest first
    pub fn take(&self) -> Vec<VrfBundle> {
        self.bundles
            .lock()
            .map(|mut b| b.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.bundles.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// [`RandomSource`] backed by the VRF engine.
///
/// Each signature yields four draws. Bundles go to a [`ProofLog`] the caller
/// keeps after handing the source to a session.
pub struct VrfRandomSource {
    engine: Arc<VrfGameEngine>,
    label: String,
    nonce: u64,
    pending: Vec<f64>,
    log: ProofLog,
}

impl VrfRandomSource {
    pub fn new(engine: Arc<VrfGameEngine>, label: impl Into<String>) -> Self {
        Self {
            engine,
            label: label.into(),
            nonce: 0,
            pending: Vec::new(),
            log: ProofLog::default(),
        }
    }

    /// Record bundles into `log` instead of a default-sized one
    pub fn with_proof_log(mut self, log: ProofLog) -> Self {
        self.log = log;
        self
    }

    pub fn proof_log(&self) -> ProofLog {
        self.log.clone()
    }

    fn refill(&mut self) {
        let (bundle, output) = self.engine.generate_outcome(&self.label, self.nonce);
        self.nonce += 1;
        self.log.push(bundle);

        let mut draws = VrfGameEngine::draws_from_output(&output);
        draws.reverse();
        self.pending = draws;
    }
}

impl RandomSource for VrfRandomSource {
    fn next_f64(&mut self) -> f64 {
        if self.pending.is_empty() {
            self.refill();
        }
        self.pending.pop().unwrap_or(0.0)
    }
}
