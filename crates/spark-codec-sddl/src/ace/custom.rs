//! 自定义条目：类型码大于 0x10，负载整体视为不透明字节。

use alloc::vec::Vec;

use super::{ACE_HEADER_LEN, AceFlags, MAX_ACE_LEN, MAX_DEFINED_ACE_TYPE, check_opaque_len, encode_header};
use crate::error::{Result, SddlError};

/// 附加数据上限：`65535 - 头部`。
pub const MAX_CUSTOM_OPAQUE_LEN: usize = MAX_ACE_LEN - ACE_HEADER_LEN;

/// 未知类型码的条目。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomAce {
    type_code: u8,
    flags: AceFlags,
    opaque: Vec<u8>,
}

impl CustomAce {
    /// 构造自定义条目；类型码必须大于已定义的最大值，附加数据须 4 字节对齐。
    pub fn new(type_code: u8, flags: AceFlags, opaque: Vec<u8>) -> Result<Self> {
        if type_code <= MAX_DEFINED_ACE_TYPE {
            return Err(SddlError::OutOfRange {
                reason: "自定义条目的类型码必须大于 0x10",
                value: u64::from(type_code),
                limit: u64::from(MAX_DEFINED_ACE_TYPE),
            });
        }
        check_opaque_len(opaque.len(), MAX_CUSTOM_OPAQUE_LEN)?;
        Ok(Self {
            type_code,
            flags,
            opaque,
        })
    }

    pub(super) fn decode(type_code: u8, flags: AceFlags, entry: &[u8], offset: usize) -> Result<Self> {
        if entry.len() - offset < ACE_HEADER_LEN {
            return Err(SddlError::entry("自定义条目声明长度小于头部", offset + 2));
        }
        Ok(Self {
            type_code,
            flags,
            opaque: entry[offset + ACE_HEADER_LEN..].to_vec(),
        })
    }

    /// 原始类型码。
    #[must_use]
    pub fn type_code(&self) -> u8 {
        self.type_code
    }

    /// 头部标志。
    #[must_use]
    pub fn flags(&self) -> AceFlags {
        self.flags
    }

    /// 替换头部标志。
    pub fn set_flags(&mut self, flags: AceFlags) {
        self.flags = flags;
    }

    /// 负载字节。
    #[must_use]
    pub fn opaque(&self) -> &[u8] {
        &self.opaque
    }

    /// 替换负载；违反长度约束时返回 `OutOfRange` 且保持原值。
    pub fn set_opaque(&mut self, opaque: Vec<u8>) -> Result<()> {
        check_opaque_len(opaque.len(), MAX_CUSTOM_OPAQUE_LEN)?;
        self.opaque = opaque;
        Ok(())
    }

    /// 二进制长度。
    #[must_use]
    pub fn binary_len(&self) -> usize {
        ACE_HEADER_LEN + self.opaque.len()
    }

    /// 将二进制形式追加到 `out`。
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        encode_header(out, self.type_code, self.flags, self.binary_len());
        out.extend_from_slice(&self.opaque);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ace::Ace;
    use alloc::vec;

    #[test]
    fn unknown_type_code_is_preserved() {
        let bytes = [0x42, 0x03, 8, 0, 0xDE, 0xAD, 0xBE, 0xEF];
        let ace = Ace::from_bytes(&bytes, 0).expect("未知类型码应解码为自定义条目");
        let Ace::Custom(custom) = &ace else {
            panic!("应为自定义条目：{ace:?}");
        };
        assert_eq!(custom.type_code(), 0x42);
        assert_eq!(custom.opaque(), &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(ace.access_mask(), None);
        assert_eq!(ace.to_bytes(), bytes);
    }

    #[test]
    fn defined_type_codes_are_refused() {
        let err = CustomAce::new(0x10, AceFlags::empty(), Vec::new()).expect_err("0x10 已定义");
        assert_eq!(err.kind(), crate::ErrorKind::OutOfRange);
        assert!(CustomAce::new(0x11, AceFlags::empty(), vec![0; 6]).is_err());
    }

    #[test]
    fn zero_declared_length_is_malformed() {
        assert!(Ace::from_bytes(&[0x42, 0, 0, 0], 0).is_err());
    }
}
