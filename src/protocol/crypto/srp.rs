use std::sync::Arc;

use num_bigint::{BigUint, RandomBits};
use num_traits::Zero;
use rand::{CryptoRng, Rng, RngCore};
use sha2::{Digest, Sha512};
use zeroize::{Zeroize, Zeroizing};

use super::CryptoError;

/// 2048-bit SRP group modulus used by Apple receivers (RFC 5054 appendix A)
const APPLE_2048_N: &[u8] = b"AC6BDB41324A9A9BF166DE5E1389582FAF72B6651987EE07FC3192943DB56050\
A37329CBB4A099ED8193E0757767A13DD52312AB4B03310DCD7F48A9DA04FD50\
E8083969EDB767B0CF6095179A163AB3661A05FBD5FAAAE82918A9962F0B93B8\
55F97993EC975EEAA80D740ADBF4FF747359D041D5C33EA71D281E446B14773B\
CA97B43A23FB801676BD207A436C6481F1D2B9078717461A5B9D32E688F87748\
544523B524B0D57D5EA77A2775D2ECFA032CFBDBF5223750353A16853027E102\
49760AED7E72571FB6B342F2D1B71032E930F639684F2DF4840F0B08438D13C6\
9D83AAD4BAD9953C3242158BF863804F4883219D8DD0979710A01523713DB893";

/// SRP group parameters with the values derived from them
#[derive(Debug, Clone)]
pub struct SrpGroup {
    n: BigUint,
    g: BigUint,
    /// k = H(N | PAD(g))
    k: BigUint,
    /// H(N) xor H(g), the first M1 component
    hn_xor_hg: [u8; 64],
    n_len: usize,
}

impl SrpGroup {
    /// The 2048-bit group with g = 2
    ///
    /// # Errors
    /// Only fails if the built-in modulus cannot be parsed.
    pub fn apple_2048() -> Result<Self, CryptoError> {
        let n = BigUint::parse_bytes(APPLE_2048_N, 16)
            .ok_or_else(|| CryptoError::SrpError("failed to parse N".to_string()))?;
        Ok(Self::from_parts(n, BigUint::from(2u32)))
    }

    fn from_parts(n: BigUint, g: BigUint) -> Self {
        let n_bytes = n.to_bytes_be();
        let n_len = n_bytes.len();

        let mut hasher = Sha512::new();
        hasher.update(&n_bytes);
        hasher.update(pad(&g.to_bytes_be(), n_len));
        let k = BigUint::from_bytes_be(&hasher.finalize());

        let hn = Sha512::digest(&n_bytes);
        let hg = Sha512::digest(g.to_bytes_be());
        let mut hn_xor_hg = [0u8; 64];
        for (out, (a, b)) in hn_xor_hg.iter_mut().zip(hn.iter().zip(hg.iter())) {
            *out = a ^ b;
        }

        Self {
            n,
            g,
            k,
            hn_xor_hg,
            n_len,
        }
    }

    /// Modulus length in bytes (the PAD width)
    #[must_use]
    pub fn modulus_len(&self) -> usize {
        self.n_len
    }

    /// u = H(PAD(A) | PAD(B))
    fn scrambler(&self, a_pub: &BigUint, b_pub: &BigUint) -> BigUint {
        let mut hasher = Sha512::new();
        hasher.update(pad(&a_pub.to_bytes_be(), self.n_len));
        hasher.update(pad(&b_pub.to_bytes_be(), self.n_len));
        BigUint::from_bytes_be(&hasher.finalize())
    }

    /// x = H(salt | H(I ":" P))
    fn private_key(salt: &[u8], identity: &[u8], password: &[u8]) -> BigUint {
        let mut inner = Sha512::new();
        inner.update(identity);
        inner.update(b":");
        inner.update(password);
        let h_ip = inner.finalize();

        let mut outer = Sha512::new();
        outer.update(salt);
        outer.update(h_ip);
        BigUint::from_bytes_be(&outer.finalize())
    }

    /// M1 = H(H(N) xor H(g) | H(I) | salt | A | B | K)
    fn client_proof(
        &self,
        identity: &[u8],
        salt: &[u8],
        a_bytes: &[u8],
        b_bytes: &[u8],
        key: &[u8],
    ) -> Vec<u8> {
        let mut hasher = Sha512::new();
        hasher.update(self.hn_xor_hg);
        hasher.update(Sha512::digest(identity));
        hasher.update(salt);
        hasher.update(a_bytes);
        hasher.update(b_bytes);
        hasher.update(key);
        hasher.finalize().to_vec()
    }

    /// M2 = H(A | M1 | K)
    fn server_proof(a_bytes: &[u8], m1: &[u8], key: &[u8]) -> Vec<u8> {
        let mut hasher = Sha512::new();
        hasher.update(a_bytes);
        hasher.update(m1);
        hasher.update(key);
        hasher.finalize().to_vec()
    }
}

/// Left-pad `bytes` with zeros to `len`
fn pad(bytes: &[u8], len: usize) -> Vec<u8> {
    if bytes.len() >= len {
        return bytes.to_vec();
    }
    let mut padded = vec![0u8; len];
    padded[len - bytes.len()..].copy_from_slice(bytes);
    padded
}

fn random_exponent<R: RngCore + CryptoRng>(rng: &mut R) -> BigUint {
    rng.sample(RandomBits::new(256))
}

/// SRP-6a client for PIN pairing
///
/// Identity is the client instance id, password is the PIN the receiver
/// displays.
pub struct SrpClient {
    group: Arc<SrpGroup>,
    identity: Vec<u8>,
    password: Zeroizing<Vec<u8>>,
    a: BigUint,
    a_bytes: Vec<u8>,
}

impl SrpClient {
    /// Create a client with a fresh 256-bit private exponent drawn from `rng`
    pub fn new<R: RngCore + CryptoRng>(
        group: Arc<SrpGroup>,
        identity: &[u8],
        password: &[u8],
        rng: &mut R,
    ) -> Self {
        Self::with_exponent(group, identity, password, random_exponent(rng))
    }

    /// Create a client with a caller-chosen private exponent
    ///
    /// Reproducible runs use this; production code should call [`new`](Self::new).
    pub fn with_private_exponent(
        group: Arc<SrpGroup>,
        identity: &[u8],
        password: &[u8],
        a: &[u8],
    ) -> Self {
        Self::with_exponent(group, identity, password, BigUint::from_bytes_be(a))
    }

    fn with_exponent(group: Arc<SrpGroup>, identity: &[u8], password: &[u8], a: BigUint) -> Self {
        let a_bytes = group.g.modpow(&a, &group.n).to_bytes_be();
        Self {
            group,
            identity: identity.to_vec(),
            password: Zeroizing::new(password.to_vec()),
            a,
            a_bytes,
        }
    }

    /// Public ephemeral A = g^a mod N, big-endian without padding
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.a_bytes
    }

    /// Compute the session key and client proof M1 for a server challenge
    ///
    /// `server_public` is used exactly as received when hashing M1.
    ///
    /// # Errors
    /// Returns `CryptoError::InvalidPublicKey` if B is 0 mod N or the
    /// scrambler u is 0.
    pub fn compute_proof(&self, salt: &[u8], server_public: &[u8]) -> Result<SrpProof, CryptoError> {
        let group = &self.group;
        let b_pub = BigUint::from_bytes_be(server_public);
        if (&b_pub % &group.n).is_zero() {
            return Err(CryptoError::InvalidPublicKey);
        }

        let a_pub = BigUint::from_bytes_be(&self.a_bytes);
        let u = group.scrambler(&a_pub, &b_pub);
        if u.is_zero() {
            return Err(CryptoError::InvalidPublicKey);
        }

        let x = SrpGroup::private_key(salt, &self.identity, &self.password);

        // S = (B - k * g^x) ^ (a + u * x) mod N, kept non-negative
        let k_gx = (&group.k * group.g.modpow(&x, &group.n)) % &group.n;
        let b_mod = &b_pub % &group.n;
        let base = if b_mod >= k_gx {
            b_mod - k_gx
        } else {
            &group.n + b_mod - k_gx
        };
        let exponent = &self.a + &u * &x;
        let s = base.modpow(&exponent, &group.n);

        let key = Zeroizing::new(Sha512::digest(s.to_bytes_be()).to_vec());
        let m1 = group.client_proof(&self.identity, salt, &self.a_bytes, server_public, &key);

        Ok(SrpProof {
            a_bytes: self.a_bytes.clone(),
            m1,
            key,
        })
    }
}

impl Drop for SrpClient {
    fn drop(&mut self) {
        self.a.set_zero();
    }
}

/// Result of processing a server challenge
pub struct SrpProof {
    a_bytes: Vec<u8>,
    m1: Vec<u8>,
    key: Zeroizing<Vec<u8>>,
}

impl SrpProof {
    /// Client proof M1 (64 bytes)
    #[must_use]
    pub fn client_proof(&self) -> &[u8] {
        &self.m1
    }

    /// Shared session key K = H(S)
    #[must_use]
    pub fn session_key(&self) -> SessionKey {
        SessionKey {
            key: self.key.to_vec(),
        }
    }

    /// Check the server's proof M2 = H(A | M1 | K)
    ///
    /// # Errors
    /// Returns `CryptoError::VerificationFailed` on mismatch.
    pub fn verify_server(&self, server_proof: &[u8]) -> Result<SessionKey, CryptoError> {
        let expected = SrpGroup::server_proof(&self.a_bytes, &self.m1, &self.key);
        if expected.as_slice() != server_proof {
            return Err(CryptoError::VerificationFailed);
        }
        Ok(self.session_key())
    }
}

/// SRP session key
pub struct SessionKey {
    key: Vec<u8>,
}

impl SessionKey {
    /// Key bytes (64)
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Receiver half of SRP-6a, as used by the in-process test receiver
pub struct SrpServer {
    group: Arc<SrpGroup>,
    identity: Vec<u8>,
    salt: Vec<u8>,
    verifier: BigUint,
    b: BigUint,
    b_bytes: Vec<u8>,
}

impl SrpServer {
    /// Start a server session for `identity`/`password` with the given salt
    pub fn new<R: RngCore + CryptoRng>(
        group: Arc<SrpGroup>,
        identity: &[u8],
        password: &[u8],
        salt: &[u8],
        rng: &mut R,
    ) -> Self {
        let x = SrpGroup::private_key(salt, identity, password);
        let verifier = group.g.modpow(&x, &group.n);
        let b = random_exponent(rng);
        // B = k*v + g^b mod N
        let b_pub = (&group.k * &verifier + group.g.modpow(&b, &group.n)) % &group.n;
        Self {
            b_bytes: b_pub.to_bytes_be(),
            group,
            identity: identity.to_vec(),
            salt: salt.to_vec(),
            verifier,
            b,
        }
    }

    /// Salt sent to the client
    #[must_use]
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Public ephemeral B
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.b_bytes
    }

    /// Check the client's M1 and produce M2
    ///
    /// # Errors
    /// Returns `CryptoError::VerificationFailed` if M1 does not match (wrong
    /// PIN), or `InvalidPublicKey` for a degenerate A.
    pub fn verify_client(&self, client_public: &[u8], m1: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let group = &self.group;
        let a_pub = BigUint::from_bytes_be(client_public);
        if (&a_pub % &group.n).is_zero() {
            return Err(CryptoError::InvalidPublicKey);
        }
        let b_pub = BigUint::from_bytes_be(&self.b_bytes);
        let u = group.scrambler(&a_pub, &b_pub);

        // S = (A * v^u) ^ b mod N
        let s = (&a_pub * self.verifier.modpow(&u, &group.n)).modpow(&self.b, &group.n);
        let key = Sha512::digest(s.to_bytes_be()).to_vec();

        let expected =
            group.client_proof(&self.identity, &self.salt, client_public, &self.b_bytes, &key);
        if expected.as_slice() != m1 {
            return Err(CryptoError::VerificationFailed);
        }
        Ok(SrpGroup::server_proof(client_public, m1, &key))
    }
}
