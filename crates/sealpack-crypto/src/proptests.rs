#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chacha20poly1305::aead::{Aead, KeyInit, Payload};
    use chacha20poly1305::ChaCha20Poly1305;
    use proptest::prelude::*;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;

    use crate::aead::{Opener, Sealer};
    use crate::config::{CryptoConfig, FingerprintMode};
    use crate::engine::CryptoEngine;
    use crate::envelope::{EnvelopeDecryptor, EnvelopeEncryptor};
    use crate::identity::Identifier;
    use crate::key_type::KeyType;
    use crate::keys::KeyPair;

    fn engine(chunk_size: usize) -> CryptoEngine {
        CryptoEngine::new(CryptoConfig { chunk_size, ..Default::default() }).unwrap()
    }

    fn seeded_pair(e: &CryptoEngine, kt: KeyType, byte: u8) -> KeyPair {
        e.generate_key_pair_from_seed(kt, &[byte; 32]).unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn test_incremental_aead_matches_one_shot(
            key in any::<[u8; 32]>(),
            nonce in any::<[u8; 12]>(),
            aad in proptest::collection::vec(any::<u8>(), 0..80),
            msg in proptest::collection::vec(any::<u8>(), 0..600),
            split in 1usize..97,
        ) {
            let expected = ChaCha20Poly1305::new(&key.into())
                .encrypt(&nonce.into(), Payload { msg: &msg, aad: &aad })
                .unwrap();

            let mut sealer = Sealer::new(&key, &nonce, &aad);
            let mut out = msg.clone();
            for piece in out.chunks_mut(split) {
                sealer.seal_in_place(piece).unwrap();
            }
            out.extend_from_slice(&sealer.finish());
            prop_assert_eq!(&out, &expected);

            let (ct, tag) = out.split_at(msg.len());
            let mut opener = Opener::new(&key, &nonce, &aad);
            let mut plain = ct.to_vec();
            for piece in plain.chunks_mut(split) {
                opener.open_in_place(piece).unwrap();
            }
            prop_assert!(opener.verify(tag).is_ok());
            prop_assert_eq!(plain, msg);
        }

        #[test]
        fn test_stream_and_buffer_encrypt_identically(
            data in proptest::collection::vec(any::<u8>(), 0..3000),
            chunk in 1usize..700,
            rng_seed in any::<[u8; 32]>(),
        ) {
            let e = engine(chunk);
            let kp = seeded_pair(&e, KeyType::Ed25519, 1);

            let mut enc = EnvelopeEncryptor::new();
            enc.add_recipient(&kp.public_key);
            let buffered = enc
                .clone()
                .start(&mut ChaCha20Rng::from_seed(rng_seed))
                .unwrap()
                .seal(&data)
                .unwrap();

            let mut session = enc.start(&mut ChaCha20Rng::from_seed(rng_seed)).unwrap();
            let mut streamed = session.header().to_vec();
            for piece in data.chunks(chunk) {
                let mut piece = piece.to_vec();
                session.seal_in_place(&mut piece).unwrap();
                streamed.extend_from_slice(&piece);
            }
            streamed.extend_from_slice(&session.finish());
            prop_assert_eq!(&streamed, &buffered);

            let mut plain = Vec::new();
            e.decrypt_stream(&mut Cursor::new(&buffered), &mut plain, &kp.private_key).unwrap();
            prop_assert_eq!(plain, data);
        }

        #[test]
        fn test_decryptor_accepts_any_split(
            data in proptest::collection::vec(any::<u8>(), 0..500),
            splits in proptest::collection::vec(1usize..64, 1..40),
        ) {
            let e = engine(1024);
            let kp = seeded_pair(&e, KeyType::Curve25519, 2);
            let env = e.encrypt(&data, &[kp.public_key.clone()]).unwrap();

            let mut dec = EnvelopeDecryptor::new(&kp.private_key);
            let mut plain = Vec::new();
            let mut rest = env.as_slice();
            for n in splits.iter().cycle() {
                if rest.is_empty() {
                    break;
                }
                let (piece, tail) = rest.split_at((*n).min(rest.len()));
                dec.update(piece, &mut plain).unwrap();
                rest = tail;
            }
            prop_assert!(dec.finish().is_ok());
            prop_assert_eq!(plain, data);
        }

        #[test]
        fn test_any_flipped_bit_is_rejected(
            data in proptest::collection::vec(any::<u8>(), 1..200),
            pos in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let e = engine(1024);
            let kp = seeded_pair(&e, KeyType::Ed25519, 3);
            let mut env = e.encrypt(&data, &[kp.public_key.clone()]).unwrap();
            let i = pos.index(env.len());
            env[i] ^= 1 << bit;
            prop_assert!(e.decrypt(&env, &kp.private_key).is_err());
        }

        #[test]
        fn test_identifier_is_deterministic(der in proptest::collection::vec(any::<u8>(), 0..200)) {
            for mode in [FingerprintMode::Sha512Truncated, FingerprintMode::Sha256] {
                prop_assert_eq!(Identifier::compute(&der, mode), Identifier::compute(&der, mode));
            }
        }

        #[test]
        fn test_seeded_keys_are_reproducible(seed in proptest::collection::vec(any::<u8>(), 32..=96)) {
            let e = engine(1024);
            let a = e.generate_key_pair_from_seed(KeyType::Ed25519, &seed).unwrap();
            let b = e.generate_key_pair_from_seed(KeyType::Ed25519, &seed).unwrap();
            prop_assert_eq!(a.identifier(), b.identifier());
            prop_assert_eq!(
                e.export_private_key(&a.private_key).unwrap(),
                e.export_private_key(&b.private_key).unwrap()
            );
        }

        #[test]
        fn test_signatures_verify(data in proptest::collection::vec(any::<u8>(), 0..300)) {
            let e = engine(1024);
            let kp = seeded_pair(&e, KeyType::Ed25519, 4);
            let sig = e.sign(&data, &kp.private_key).unwrap();
            prop_assert!(e.verify(&data, &sig, &kp.public_key).unwrap());
            prop_assert!(e.verify_stream(&mut Cursor::new(&data), &sig, &kp.public_key).unwrap());
        }
    }
}
