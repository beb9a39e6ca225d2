//! 普通条目与回调条目：`header | mask(4) | sid | opaque`。

use alloc::vec::Vec;

use super::{ACE_HEADER_LEN, AceFlags, AceQualifier, AceType, check_opaque_len, encode_header};
use crate::error::{Result, SddlError};
use crate::sid::{self, Sid};
use crate::wire;

/// 附加数据上限：`65535 - 头部 - 掩码 - 最长 SID`。
pub const MAX_COMMON_OPAQUE_LEN: usize = super::MAX_ACE_LEN - ACE_HEADER_LEN - 4 - sid::MAX_BINARY_LEN;

/// 普通条目（类型码 0x00..=0x03 及其回调形式 0x09/0x0A/0x0D/0x0E）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonAce {
    flags: AceFlags,
    qualifier: AceQualifier,
    is_callback: bool,
    access_mask: u32,
    sid: Sid,
    opaque: Vec<u8>,
}

impl CommonAce {
    /// 构造普通条目；附加数据须 4 字节对齐且不超过 [`MAX_COMMON_OPAQUE_LEN`]。
    pub fn new(
        flags: AceFlags,
        qualifier: AceQualifier,
        access_mask: u32,
        sid: Sid,
        is_callback: bool,
        opaque: Vec<u8>,
    ) -> Result<Self> {
        check_opaque_len(opaque.len(), MAX_COMMON_OPAQUE_LEN)?;
        Ok(Self {
            flags,
            qualifier,
            is_callback,
            access_mask,
            sid,
            opaque,
        })
    }

    pub(super) fn decode(
        ace_type: AceType,
        flags: AceFlags,
        entry: &[u8],
        offset: usize,
    ) -> Result<Self> {
        let access_mask = wire::read_u32(entry, offset + ACE_HEADER_LEN)
            .ok_or(SddlError::entry("条目过短，缺少访问掩码", offset))?;
        let sid = Sid::from_bytes(entry, offset + ACE_HEADER_LEN + 4)?;
        let fixed = ACE_HEADER_LEN + 4 + sid.binary_len();
        let opaque = &entry[offset + fixed..];
        if opaque.len() > MAX_COMMON_OPAQUE_LEN {
            return Err(SddlError::entry("附加数据超过上限", offset + fixed));
        }
        Ok(Self {
            flags,
            qualifier: ace_type.qualifier(),
            is_callback: ace_type.is_callback(),
            access_mask,
            sid,
            opaque: opaque.to_vec(),
        })
    }

    /// 类型码。
    #[must_use]
    pub fn ace_type(&self) -> AceType {
        AceType::from_parts(self.qualifier, self.is_callback, false)
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

    /// 限定符。
    #[must_use]
    pub fn qualifier(&self) -> AceQualifier {
        self.qualifier
    }

    /// 是否为回调条目。
    #[must_use]
    pub fn is_callback(&self) -> bool {
        self.is_callback
    }

    /// 访问掩码。
    #[must_use]
    pub fn access_mask(&self) -> u32 {
        self.access_mask
    }

    /// 替换访问掩码。
    pub fn set_access_mask(&mut self, access_mask: u32) {
        self.access_mask = access_mask;
    }

    /// 主体标识符。
    #[must_use]
    pub fn sid(&self) -> &Sid {
        &self.sid
    }

    /// 替换主体标识符。
    pub fn set_sid(&mut self, sid: Sid) {
        self.sid = sid;
    }

    /// 附加数据。
    #[must_use]
    pub fn opaque(&self) -> &[u8] {
        &self.opaque
    }

    /// 替换附加数据；违反长度约束时返回 `OutOfRange` 且保持原值。
    pub fn set_opaque(&mut self, opaque: Vec<u8>) -> Result<()> {
        check_opaque_len(opaque.len(), MAX_COMMON_OPAQUE_LEN)?;
        self.opaque = opaque;
        Ok(())
    }

    /// 二进制长度。
    #[must_use]
    pub fn binary_len(&self) -> usize {
        ACE_HEADER_LEN + 4 + self.sid.binary_len() + self.opaque.len()
    }

    /// 将二进制形式追加到 `out`。
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        encode_header(out, self.ace_type().as_u8(), self.flags, self.binary_len());
        wire::put_u32(out, self.access_mask);
        self.sid.encode_into(out);
        out.extend_from_slice(&self.opaque);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ace::Ace;
    use alloc::vec;

    fn administrators() -> Sid {
        "BA".parse().expect("BA 缩写应可解析")
    }

    #[test]
    fn encodes_header_mask_sid() {
        let ace = CommonAce::new(
            AceFlags::INHERITED,
            AceQualifier::AccessDenied,
            0x0012_0089,
            administrators(),
            false,
            Vec::new(),
        )
        .expect("无附加数据合法");
        let mut out = Vec::new();
        ace.encode_into(&mut out);
        assert_eq!(out.len(), ace.binary_len());
        assert_eq!(&out[..8], &[0x01, 0x10, 24, 0, 0x89, 0x00, 0x12, 0x00]);
        assert_eq!(&out[8..], administrators().to_bytes().as_slice());
    }

    #[test]
    fn callback_trailer_survives_decode() {
        let ace = CommonAce::new(
            AceFlags::empty(),
            AceQualifier::AccessAllowed,
            0x1,
            administrators(),
            true,
            vec![0xAA, 0xBB, 0xCC, 0xDD],
        )
        .expect("4 字节附加数据合法");
        assert_eq!(ace.ace_type(), AceType::AccessAllowedCallback);
        let bytes = Ace::from(ace.clone()).to_bytes();
        assert_eq!(Ace::from_bytes(&bytes, 0), Ok(Ace::Common(ace)));
    }

    #[test]
    fn opaque_length_is_bounded() {
        let mut ace = CommonAce::new(
            AceFlags::empty(),
            AceQualifier::SystemAudit,
            0,
            administrators(),
            false,
            Vec::new(),
        )
        .expect("合法");
        let err = ace.set_opaque(vec![0; 3]).expect_err("未对齐");
        assert_eq!(err.kind(), crate::ErrorKind::OutOfRange);
        let err = ace
            .set_opaque(vec![0; MAX_COMMON_OPAQUE_LEN + 1])
            .expect_err("超过上限");
        assert_eq!(err.kind(), crate::ErrorKind::OutOfRange);
        assert!(ace.opaque().is_empty(), "失败时保持原值");
        ace.set_opaque(vec![0; 8]).expect("对齐且未超限");
        assert_eq!(ace.binary_len(), 4 + 4 + 16 + 8);
    }

    #[test]
    fn truncated_sid_fails() {
        let bytes = Ace::from(
            CommonAce::new(
                AceFlags::empty(),
                AceQualifier::AccessAllowed,
                0,
                administrators(),
                false,
                Vec::new(),
            )
            .expect("合法"),
        )
        .to_bytes();
        let mut shortened = bytes.clone();
        shortened[2] = 20;
        shortened.truncate(20);
        assert!(Ace::from_bytes(&shortened, 0).is_err());
    }
}
