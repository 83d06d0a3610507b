// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end put/pop behaviour against a real SQLite file.

use std::time::Duration;

use ember_core::{Algorithm, EmberError, Locator};
use ember_storage::{KdfParams, engine_cipher};
use ember_test_utils::TestVault;
use ember_vault::cipher::Sealed;
use ember_vault::token::HEADER_LEN;
use ember_vault::{CipherSuite, Token};
use secrecy::ExposeSecret;
use zeroize::Zeroizing;

const BOTH: [Algorithm; 2] = [Algorithm::EmbeddedKeyAead, Algorithm::StorageManagedPassphrase];

#[tokio::test]
async fn hello_world_then_corrupted_legacy_token() {
    let env = TestVault::new().await.unwrap();

    let t1 = env.vault.put(b"hello world", Algorithm::EmbeddedKeyAead).await.unwrap();
    let secret = env.vault.pop(&t1).await.unwrap();
    assert_eq!(secret.expose_secret(), b"hello world");
    assert!(matches!(env.vault.pop(&t1).await, Err(EmberError::NotFound)));

    let t2 = env
        .vault
        .put(b"secondary", Algorithm::StorageManagedPassphrase)
        .await
        .unwrap();
    let mut corrupted = t2.to_vec();
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0x01;
    assert!(matches!(env.vault.pop(&corrupted).await, Err(EmberError::NotFound)));

    let secret = env.vault.pop(&t2).await.unwrap();
    assert_eq!(secret.expose_secret(), b"secondary");
}

#[tokio::test]
async fn binary_secrets_roundtrip_for_both_algorithms() {
    let env = TestVault::new().await.unwrap();
    let payloads: [&[u8]; 3] = [b"", &[0u8, 255, 0, 1], &[0x5a; 4096]];
    for algorithm in BOTH {
        for payload in payloads {
            let token = env.vault.put(payload, algorithm).await.unwrap();
            let secret = env.vault.pop(&token).await.unwrap();
            assert_eq!(secret.expose_secret(), payload, "{algorithm}");
        }
    }
    assert_eq!(env.row_count().await.unwrap(), 0);
}

#[tokio::test]
async fn token_is_single_use_for_both_algorithms() {
    let env = TestVault::new().await.unwrap();
    for algorithm in BOTH {
        let token = env.vault.put(b"once", algorithm).await.unwrap();
        env.vault.pop(&token).await.unwrap();
        let second = env.vault.pop(&token).await.unwrap_err();
        assert!(second.is_not_found());
        assert_eq!(second.client_message(), "not found");
    }
}

#[tokio::test]
async fn flipped_key_or_locator_bits_leave_record_intact() {
    let env = TestVault::new().await.unwrap();
    let token = env.vault.put(b"guarded", Algorithm::EmbeddedKeyAead).await.unwrap();

    for byte in 2..token.len() {
        let mut forged = token.to_vec();
        forged[byte] ^= 1 << (byte % 8);
        let err = env.vault.pop(&forged).await.unwrap_err();
        assert!(err.is_not_found(), "byte {byte}: {err}");
    }

    assert_eq!(env.live_count().await.unwrap(), 1);
    let secret = env.vault.pop(&token).await.unwrap();
    assert_eq!(secret.expose_secret(), b"guarded");
}

#[tokio::test]
async fn flipped_passphrase_bits_leave_record_intact() {
    let env = TestVault::new().await.unwrap();
    let token = env
        .vault
        .put(b"legacy guarded", Algorithm::StorageManagedPassphrase)
        .await
        .unwrap();

    // One locator byte and a spread of passphrase bytes, including flips that
    // keep the passphrase valid UTF-8 and reach the engine.
    for byte in [2, 17, HEADER_LEN, HEADER_LEN + 31, token.len() - 1] {
        for bit in [0u8, 7] {
            let mut forged = token.to_vec();
            forged[byte] ^= 1 << bit;
            assert!(env.vault.pop(&forged).await.unwrap_err().is_not_found());
        }
    }

    let secret = env.vault.pop(&token).await.unwrap();
    assert_eq!(secret.expose_secret(), b"legacy guarded");
}

#[tokio::test]
async fn swapped_ciphertexts_do_not_open() {
    let env = TestVault::new().await.unwrap();
    let a = env.vault.put(b"alpha", Algorithm::EmbeddedKeyAead).await.unwrap();
    let b = env.vault.put(b"bravo", Algorithm::EmbeddedKeyAead).await.unwrap();

    // Token A's key with token B's locator.
    let mut mixed = a.to_vec();
    mixed[2..HEADER_LEN].copy_from_slice(&b[2..HEADER_LEN]);
    assert!(env.vault.pop(&mixed).await.unwrap_err().is_not_found());

    assert_eq!(env.vault.pop(&a).await.unwrap().expose_secret(), b"alpha");
    assert_eq!(env.vault.pop(&b).await.unwrap().expose_secret(), b"bravo");
}

#[tokio::test]
async fn empty_or_short_keys_are_not_found() {
    let env = TestVault::new().await.unwrap();
    for algorithm in BOTH {
        let token = env.vault.put(b"kept", algorithm).await.unwrap();

        let header_only = &token[..HEADER_LEN];
        assert!(env.vault.pop(header_only).await.unwrap_err().is_not_found());

        let truncated = &token[..token.len() - 1];
        assert!(env.vault.pop(truncated).await.unwrap_err().is_not_found());

        assert_eq!(env.vault.pop(&token).await.unwrap().expose_secret(), b"kept");
    }
}

#[tokio::test]
async fn malformed_tokens_are_bad_requests() {
    let env = TestVault::new().await.unwrap();
    let err = env.vault.pop(&[1u8; HEADER_LEN - 1]).await.unwrap_err();
    assert!(matches!(err, EmberError::MalformedToken));
    assert_eq!(err.client_message(), "bad request");

    let token = env.vault.put(b"x", Algorithm::EmbeddedKeyAead).await.unwrap();
    let mut unknown = token.to_vec();
    unknown[1] = 0x7f;
    let err = env.vault.pop(&unknown).await.unwrap_err();
    assert!(matches!(err, EmberError::UnknownAlgorithm(0x7f)));
}

#[tokio::test]
async fn ciphertext_never_contains_plaintext() {
    let env = TestVault::new().await.unwrap();
    let marker = b"PLAINTEXT-MARKER-0123456789";
    for algorithm in BOTH {
        env.vault.put(marker, algorithm).await.unwrap();
    }
    for blob in env.stored_ciphertexts().await.unwrap() {
        assert!(!blob.windows(marker.len()).any(|w| w == marker));
    }
}

#[tokio::test]
async fn oversize_secret_is_rejected() {
    let env = TestVault::builder()
        .with_max_secret_bytes(16)
        .build()
        .await
        .unwrap();
    let err = env
        .vault
        .put(&[0u8; 17], Algorithm::StorageManagedPassphrase)
        .await
        .unwrap_err();
    assert!(matches!(err, EmberError::SecretTooLarge { size: 17, limit: 16 }));
    assert_eq!(err.client_message(), "bad request");
    assert_eq!(env.row_count().await.unwrap(), 0);
}

#[tokio::test]
async fn expired_record_is_not_found_before_and_after_sweep() {
    let env = TestVault::new().await.unwrap();
    let aead = env.vault.put(b"stale", Algorithm::EmbeddedKeyAead).await.unwrap();
    let legacy = env
        .vault
        .put(b"stale", Algorithm::StorageManagedPassphrase)
        .await
        .unwrap();
    assert_eq!(env.expire_all().await.unwrap(), 2);

    assert!(env.vault.pop(&aead).await.unwrap_err().is_not_found());
    assert_eq!(env.row_count().await.unwrap(), 2);

    assert_eq!(env.reaper.sweep().await.unwrap(), 2);
    assert_eq!(env.row_count().await.unwrap(), 0);
    assert!(env.vault.pop(&legacy).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn put_default_follows_builder() {
    let env = TestVault::builder()
        .with_default_algorithm(Algorithm::StorageManagedPassphrase)
        .build()
        .await
        .unwrap();
    let token = env.vault.put_default(b"configured").await.unwrap();
    assert_eq!(token[1], Algorithm::StorageManagedPassphrase.tag());
    assert_eq!(env.vault.pop(&token).await.unwrap().expose_secret(), b"configured");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oversized_kdf_header_fails_fast_and_keeps_writers_moving() {
    let env = TestVault::new().await.unwrap();
    let token = env
        .vault
        .put(b"legacy", Algorithm::StorageManagedPassphrase)
        .await
        .unwrap();
    let locator = Token::parse(&token).unwrap().locator;
    // Iterations sit at bytes 5..9 of the blob header.
    env.tamper(locator, |blob| blob[5..9].copy_from_slice(&1_000_000u32.to_le_bytes()))
        .await
        .unwrap();

    let peer = env.open_peer().await.unwrap();
    let err = tokio::time::timeout(Duration::from_secs(5), peer.pop(&token))
        .await
        .expect("pop should not run the oversized KDF")
        .unwrap_err();
    assert!(err.is_not_found());

    tokio::time::timeout(
        Duration::from_secs(5),
        env.vault.put(b"next", Algorithm::EmbeddedKeyAead),
    )
    .await
    .expect("writer should get the lock")
    .unwrap();
    assert_eq!(env.row_count().await.unwrap(), 2);
}

#[tokio::test]
async fn passphrase_token_never_opens_an_aead_row() {
    let env = TestVault::new().await.unwrap();
    let passphrase = b"6f6e652074696d652070617373706872617365";
    let params = KdfParams {
        memory_cost: 8192,
        iterations: 1,
        parallelism: 1,
    };
    let blob = engine_cipher::seal(params, passphrase, b"cross-suite").unwrap();
    let token_for = |locator| {
        Token {
            algorithm: Algorithm::StorageManagedPassphrase,
            locator,
            key: Zeroizing::new(passphrase.to_vec()),
        }
        .pack()
    };

    // A blob the passphrase would open, filed as an AEAD record.
    let mislabelled = Locator([0x33; 16]);
    env.plant(mislabelled, Algorithm::EmbeddedKeyAead, blob.clone())
        .await
        .unwrap();
    assert!(env.vault.pop(&token_for(mislabelled)).await.unwrap_err().is_not_found());
    assert_eq!(env.row_count().await.unwrap(), 1);

    let labelled = Locator([0x34; 16]);
    env.plant(labelled, Algorithm::StorageManagedPassphrase, blob)
        .await
        .unwrap();
    let secret = env.vault.pop(&token_for(labelled)).await.unwrap();
    assert_eq!(secret.expose_secret(), b"cross-suite");
}

#[tokio::test]
async fn aead_token_never_opens_a_passphrase_row() {
    let env = TestVault::new().await.unwrap();
    let suite = CipherSuite::generate(Algorithm::EmbeddedKeyAead).unwrap();
    let Sealed::Ciphertext { locator, blob } = suite.seal(b"cross-suite").unwrap() else {
        panic!("AEAD suite seals in process");
    };
    env.plant(locator, Algorithm::StorageManagedPassphrase, blob)
        .await
        .unwrap();

    let token = suite.token(locator).pack();
    assert!(env.vault.pop(&token).await.unwrap_err().is_not_found());
    assert_eq!(env.row_count().await.unwrap(), 1);
}
