use ark_bn254::Fr;
use ark_std::UniformRand;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::OsRng;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use sha2::Sha256;
use zkid_proof_core::poseidon::poseidon_hash;
use zkid_proof_core::zkinput::{generate_zk_input, JwksEntry, JwksSet, ZkInputRequest};

fn build_jwt_and_jwks() -> (String, JwksSet) {
    let header_json = r#"{"alg":"RS256","kid":"bench-kid","typ":"JWT"}"#;
    let payload_json = r#"{"iss":"https://accounts.google.com","aud":"bench-client-id.apps.googleusercontent.com","sub":"110169484474386276334","nonce":"abcDEF123hij"}"#;

    let header_b64 = URL_SAFE_NO_PAD.encode(header_json);
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json);
    let unsigned = format!("{}.{}", header_b64, payload_b64);

    let mut rng = OsRng;
    let priv_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
    let signing_key = SigningKey::<Sha256>::new(priv_key.clone());
    let signature = signing_key.sign_with_rng(&mut rng, unsigned.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());
    let jwt = format!("{}.{}", unsigned, sig_b64);

    let pub_key = priv_key.to_public_key();
    let n_b64 = URL_SAFE_NO_PAD.encode(pub_key.n().to_bytes_be());
    let jwks = JwksSet {
        keys: vec![JwksEntry {
            kty: "RSA".into(),
            kid: "bench-kid".into(),
            n: n_b64,
            e: "AQAB".into(),
            alg: Some("RS256".into()),
            use_: Some("sig".into()),
        }],
    };
    (jwt, jwks)
}

fn poseidon_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("poseidon_hash");
    let mut rng = OsRng;
    for arity in [1usize, 2, 5, 8, 16, 24, 32] {
        let inputs: Vec<Fr> = (0..arity).map(|_| Fr::rand(&mut rng)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(arity), &inputs, |b, inputs| {
            b.iter(|| poseidon_hash(inputs).unwrap());
        });
    }
    group.finish();
}

fn zk_input_benchmark(c: &mut Criterion) {
    let (jwt, jwks) = build_jwt_and_jwks();
    let req = ZkInputRequest {
        jwt,
        salt: "25299916604528864863320632865981".into(),
        ephemeral_public_key: "0xfafd1d9e25a87e9652976a7bb06c2e4777c2e539d90f3ee7b6b12b9a45118a8".into(),
        max_epoch: "1".into(),
        randomness: "29229108527107981601948220068988".into(),
        jwks,
    };

    let mut group = c.benchmark_group("zk_input_builder");
    group.sample_size(20);
    group.bench_function("generate_zk_input", |b| {
        b.iter(|| generate_zk_input(&req).unwrap());
    });
    group.finish();
}

criterion_group!(benches, poseidon_benchmark, zk_input_benchmark);
criterion_main!(benches);
