//! Conversion helpers between proto types and common Rust types.

use crate::v1::CustomParamV1;

impl From<(&[u8], &[u8])> for CustomParamV1 {
    fn from((key, value): (&[u8], &[u8])) -> Self {
        Self { key: key.to_vec(), value: value.to_vec() }
    }
}

impl From<CustomParamV1> for (Vec<u8>, Vec<u8>) {
    fn from(param: CustomParamV1) -> Self {
        (param.key, param.value)
    }
}
