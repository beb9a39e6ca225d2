//! 复合条目：`header | mask(4) | compound_type(2) | reserved(2) | sid`，不携带附加数据。

use alloc::vec::Vec;

use super::{ACE_HEADER_LEN, AceFlags, AceType, encode_header};
use crate::error::{Result, SddlError};
use crate::sid::Sid;
use crate::wire;

/// 复合条目种类；目前只定义了模拟身份。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CompoundAceType {
    /// 模拟身份（1）。
    Impersonation,
}

impl CompoundAceType {
    /// 线上编码。
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::Impersonation => 1,
        }
    }

    /// 从线上编码还原。
    #[must_use]
    pub const fn from_u16(raw: u16) -> Option<Self> {
        match raw {
            1 => Some(Self::Impersonation),
            _ => None,
        }
    }
}

/// 复合条目（类型码 0x04）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundAce {
    flags: AceFlags,
    access_mask: u32,
    compound_type: CompoundAceType,
    sid: Sid,
}

impl CompoundAce {
    /// 构造复合条目。
    #[must_use]
    pub fn new(flags: AceFlags, access_mask: u32, compound_type: CompoundAceType, sid: Sid) -> Self {
        Self {
            flags,
            access_mask,
            compound_type,
            sid,
        }
    }

    pub(super) fn decode(flags: AceFlags, entry: &[u8], offset: usize) -> Result<Self> {
        let access_mask = wire::read_u32(entry, offset + ACE_HEADER_LEN)
            .ok_or(SddlError::entry("复合条目过短，缺少访问掩码", offset))?;
        let raw_type = wire::read_u16(entry, offset + ACE_HEADER_LEN + 4)
            .ok_or(SddlError::entry("复合条目过短，缺少复合种类", offset))?;
        let compound_type = CompoundAceType::from_u16(raw_type)
            .ok_or(SddlError::entry("未知的复合条目种类", offset + ACE_HEADER_LEN + 4))?;
        let sid = Sid::from_bytes(entry, offset + ACE_HEADER_LEN + 8)?;
        let ace = Self::new(flags, access_mask, compound_type, sid);
        if ace.binary_len() != entry.len() - offset {
            return Err(SddlError::entry("复合条目声明长度与实际长度不符", offset + 2));
        }
        Ok(ace)
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

    /// 访问掩码。
    #[must_use]
    pub fn access_mask(&self) -> u32 {
        self.access_mask
    }

    /// 复合种类。
    #[must_use]
    pub fn compound_type(&self) -> CompoundAceType {
        self.compound_type
    }

    /// 被模拟的主体。
    #[must_use]
    pub fn sid(&self) -> &Sid {
        &self.sid
    }

    /// 二进制长度。
    #[must_use]
    pub fn binary_len(&self) -> usize {
        ACE_HEADER_LEN + 8 + self.sid.binary_len()
    }

    /// 将二进制形式追加到 `out`。
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        encode_header(
            out,
            AceType::AccessAllowedCompound.as_u8(),
            self.flags,
            self.binary_len(),
        );
        wire::put_u32(out, self.access_mask);
        wire::put_u16(out, self.compound_type.as_u16());
        wire::put_u16(out, 0);
        self.sid.encode_into(out);
    }
}
