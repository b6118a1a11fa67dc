#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use prost::Message;

    use crate::v1::{
        AlgIdV1, CustomParamV1, DataCipherAlgV1, DataCipherV1, KeyRecipientV1, MessageInfoV1,
        MESSAGE_INFO_VERSION,
    };
    use crate::validation::Validate;

    prop_compose! {
        fn any_x25519_recipient()(
            recipient_id in proptest::collection::vec(any::<u8>(), 8..=32),
            ephemeral in proptest::collection::vec(any::<u8>(), 32),
            wrapped in proptest::collection::vec(any::<u8>(), 1..64),
        ) -> KeyRecipientV1 {
            KeyRecipientV1 {
                recipient_id,
                key_alg: AlgIdV1::Curve25519 as i32,
                encapsulated_key: ephemeral,
                wrapped_key: wrapped,
            }
        }
    }

    prop_compose! {
        fn any_message_info()(
            recipients in proptest::collection::vec(any_x25519_recipient(), 1..4),
            nonce in proptest::collection::vec(any::<u8>(), 12),
            values in proptest::collection::vec(any::<Vec<u8>>(), 0..4),
        ) -> MessageInfoV1 {
            // Index-derived keys keep the custom parameters unique
            let custom_params = values
                .into_iter()
                .enumerate()
                .map(|(i, value)| CustomParamV1 { key: format!("param-{i}").into_bytes(), value })
                .collect();
            MessageInfoV1 {
                version: MESSAGE_INFO_VERSION,
                recipients,
                data_cipher: Some(DataCipherV1 {
                    alg: DataCipherAlgV1::ChaCha20Poly1305 as i32,
                    nonce,
                }),
                custom_params,
            }
        }
    }

    proptest! {
        // Well-formed headers stay valid after a trip over the wire
        #[test]
        fn prop_valid_header_survives_encoding(info in any_message_info()) {
            prop_assert!(info.validate().is_ok());
            let decoded = MessageInfoV1::decode(info.encode_to_vec().as_slice()).unwrap();
            prop_assert!(decoded.validate().is_ok());
            prop_assert_eq!(decoded, info);
        }

        // Custom parameter order is part of the header
        #[test]
        fn prop_custom_param_order_preserved(info in any_message_info()) {
            let decoded = MessageInfoV1::decode(info.encode_to_vec().as_slice()).unwrap();
            let keys: Vec<_> = decoded.custom_params.iter().map(|p| p.key.clone()).collect();
            let expected: Vec<_> = info.custom_params.iter().map(|p| p.key.clone()).collect();
            prop_assert_eq!(keys, expected);
        }
    }
}
