//! 安全标识符（SID）的二进制与文本编解码。
//!
//! ## 教案目的（Why）
//! - SID 是所有权、组与访问条目的主体标识；上层结构（ACE/描述符）在编解码时都依赖这里的长度与合法性校验。
//!
//! ## 交互契约（What）
//! - 二进制布局：`revision(1) | count(1) | authority(6, 大端) | sub_authority[count](各 4 字节, 小端)`。
//! - 文本形式：`S-1-<authority>-<sub>...`，或 SDDL 两字母缩写（见 [`crate::sddl::tables`]）。
//! - 修订号固定为 1，子颁发机构不超过 15 个，颁发机构不超过 48 位。
//!
//! ## 实现策略（How）
//! - 子颁发机构使用 `SmallVec` 保存，常见 SID（≤ 8 段）无需堆分配。
//! - 排序先比较颁发机构，再比较子颁发机构数量，最后逐段比较，与 Windows 的比较顺序一致。

mod well_known;

use alloc::vec::Vec;
use core::{cmp::Ordering, fmt, str::FromStr};

use smallvec::SmallVec;
use tracing::trace;

use crate::error::{Result, SddlError};
use crate::sddl::tables;
use crate::wire;

pub use self::well_known::{SidParts, WellKnownSidKind};

/// SID 修订号。
pub const SID_REVISION: u8 = 1;
/// 子颁发机构数量上限。
pub const MAX_SUB_AUTHORITIES: usize = 15;
/// 颁发机构上限（6 字节）。
pub const MAX_AUTHORITY: u64 = 0xFFFF_FFFF_FFFF;
/// 最短二进制长度（无子颁发机构）。
pub const MIN_BINARY_LEN: usize = 8;
/// 最长二进制长度（15 个子颁发机构）。
pub const MAX_BINARY_LEN: usize = MIN_BINARY_LEN + 4 * MAX_SUB_AUTHORITIES;
/// NT 颁发机构（`S-1-5`）。
pub const NT_AUTHORITY: u64 = 5;

const ACCOUNT_DOMAIN_RID: u32 = 21;

/// 安全标识符。
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Sid {
    authority: u64,
    sub_authorities: SmallVec<[u32; 8]>,
}

impl Sid {
    /// 由颁发机构与子颁发机构构造。
    ///
    /// 颁发机构超过 48 位或子颁发机构多于 15 个时返回 `OutOfRange`。
    pub fn new(authority: u64, sub_authorities: &[u32]) -> Result<Self> {
        if authority > MAX_AUTHORITY {
            return Err(SddlError::OutOfRange {
                reason: "颁发机构超过 6 字节",
                value: authority,
                limit: MAX_AUTHORITY,
            });
        }
        if sub_authorities.len() > MAX_SUB_AUTHORITIES {
            return Err(SddlError::OutOfRange {
                reason: "子颁发机构数量",
                value: sub_authorities.len() as u64,
                limit: MAX_SUB_AUTHORITIES as u64,
            });
        }
        Ok(Self {
            authority,
            sub_authorities: SmallVec::from_slice(sub_authorities),
        })
    }

    /// 按知名种类构造；域相对种类需要提供 `domain`。
    pub fn from_well_known(kind: WellKnownSidKind, domain: Option<&Sid>) -> Result<Self> {
        kind.to_sid(domain)
    }

    /// 从 `bytes[offset..]` 解码一个 SID。
    pub fn from_bytes(bytes: &[u8], offset: usize) -> Result<Self> {
        let header = wire::slice(bytes, offset, MIN_BINARY_LEN)
            .ok_or(SddlError::identifier("剩余字节不足以容纳 SID 头部", offset))?;
        if header[0] != SID_REVISION {
            trace!(revision = header[0], offset, "拒绝未知的 SID 修订号");
            return Err(SddlError::identifier("SID 修订号必须为 1", offset));
        }
        let count = usize::from(header[1]);
        if count > MAX_SUB_AUTHORITIES {
            return Err(SddlError::identifier("子颁发机构数量超过 15", offset + 1));
        }
        let authority = header[2..8]
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));

        let body_at = offset + MIN_BINARY_LEN;
        let body = wire::slice(bytes, body_at, 4 * count)
            .ok_or(SddlError::identifier("子颁发机构被截断", body_at))?;
        let sub_authorities = body
            .chunks_exact(4)
            .map(|raw| u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
            .collect();
        Ok(Self {
            authority,
            sub_authorities,
        })
    }

    /// 解析 `S-1-…` 文本或 SDDL 两字母缩写。
    pub fn parse(text: &str) -> Result<Self> {
        if let Some((authority, sub_authorities)) = tables::sid_abbreviation(text) {
            return Self::new(authority, sub_authorities);
        }
        if tables::is_domain_abbreviation(text) {
            return Err(SddlError::unsupported("域相对缩写需要域上下文", text));
        }

        let mut components = components_with_offsets(text);
        match components.next() {
            Some((_, "S" | "s")) => {}
            _ => return Err(SddlError::identifier("缺少 `S-` 前缀", 0)),
        }
        match components.next() {
            Some((_, "1")) => {}
            Some((at, _)) => return Err(SddlError::identifier("SID 修订号必须为 1", at)),
            None => return Err(SddlError::identifier("SID 文本分段不足", text.len())),
        }
        let (authority_at, authority_text) = components
            .next()
            .ok_or(SddlError::identifier("SID 文本分段不足", text.len()))?;
        let authority = parse_authority(authority_text, authority_at)?;

        let mut sub_authorities = SmallVec::<[u32; 8]>::new();
        for (at, component) in components {
            let value = parse_decimal_u32(component)
                .ok_or(SddlError::identifier("子颁发机构不是 32 位十进制整数", at))?;
            if sub_authorities.len() == MAX_SUB_AUTHORITIES {
                return Err(SddlError::identifier("子颁发机构数量超过 15", at));
            }
            sub_authorities.push(value);
        }
        Ok(Self {
            authority,
            sub_authorities,
        })
    }

    /// 修订号（恒为 1）。
    #[must_use]
    pub const fn revision(&self) -> u8 {
        SID_REVISION
    }

    /// 48 位颁发机构。
    #[must_use]
    pub const fn authority(&self) -> u64 {
        self.authority
    }

    /// 子颁发机构序列。
    #[must_use]
    pub fn sub_authorities(&self) -> &[u32] {
        &self.sub_authorities
    }

    /// 子颁发机构数量。
    #[must_use]
    pub fn sub_authority_count(&self) -> usize {
        self.sub_authorities.len()
    }

    /// 最后一个子颁发机构（相对标识符）。
    #[must_use]
    pub fn rid(&self) -> Option<u32> {
        self.sub_authorities.last().copied()
    }

    /// 在末尾追加一个相对标识符，得到新的 SID。
    pub fn with_rid(&self, rid: u32) -> Result<Self> {
        let mut sub_authorities = self.sub_authorities.clone();
        sub_authorities.push(rid);
        Self::new(self.authority, &sub_authorities)
    }

    /// 是否为账户域标识符（`S-1-5-21-a-b-c`）。
    #[must_use]
    pub fn is_account_domain(&self) -> bool {
        self.authority == NT_AUTHORITY
            && self.sub_authorities.len() == 4
            && self.sub_authorities[0] == ACCOUNT_DOMAIN_RID
    }

    /// 反查固定形态的知名种类；多个种类共享同一形态时返回编号最小者。
    #[must_use]
    pub fn well_known_kind(&self) -> Option<WellKnownSidKind> {
        WellKnownSidKind::ALL.iter().copied().find(|kind| {
            matches!(
                kind.parts(),
                SidParts::Fixed { authority, sub_authorities }
                    if authority == self.authority && sub_authorities == self.sub_authorities.as_slice()
            )
        })
    }

    /// 是否等于给定的固定形态种类。
    #[must_use]
    pub fn is_well_known(&self, kind: WellKnownSidKind) -> bool {
        matches!(
            kind.parts(),
            SidParts::Fixed { authority, sub_authorities }
                if authority == self.authority && sub_authorities == self.sub_authorities.as_slice()
        )
    }

    /// 二进制长度：`8 + 4 × count`。
    #[must_use]
    pub fn binary_len(&self) -> usize {
        MIN_BINARY_LEN + 4 * self.sub_authorities.len()
    }

    /// 将二进制形式追加到 `out`。
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(SID_REVISION);
        out.push(self.sub_authorities.len() as u8);
        out.extend_from_slice(&self.authority.to_be_bytes()[2..]);
        for sub in &self.sub_authorities {
            wire::put_u32(out, *sub);
        }
    }

    /// 返回二进制形式。
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.binary_len());
        self.encode_into(&mut out);
        out
    }

    /// 写入 `buffer[offset..]`，返回写入字节数；空间不足时返回 `BufferTooSmall`。
    pub fn write_to(&self, buffer: &mut [u8], offset: usize) -> Result<usize> {
        wire::copy_out(&self.to_bytes(), buffer, offset)
    }
}

/// 按 `-` 切分，并给出每段在原文中的起始位置。
fn components_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split('-').scan(0, |at, component| {
        let start = *at;
        *at += component.len() + 1;
        Some((start, component))
    })
}

/// 只接受纯十进制数字；`+` 之类的符号不属于 SID 文本。
fn parse_decimal_u32(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_authority(text: &str, at: usize) -> Result<u64> {
    let (digits, radix) = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (text, 10),
    };
    let well_formed = !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix));
    match well_formed.then(|| u64::from_str_radix(digits, radix)) {
        Some(Ok(authority)) if authority <= MAX_AUTHORITY => Ok(authority),
        Some(Ok(_)) => Err(SddlError::identifier("颁发机构超过 6 字节", at)),
        _ => Err(SddlError::identifier("颁发机构不是整数", at)),
    }
}

impl Ord for Sid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.authority
            .cmp(&other.authority)
            .then_with(|| self.sub_authorities.len().cmp(&other.sub_authorities.len()))
            .then_with(|| self.sub_authorities.cmp(&other.sub_authorities))
    }
}

impl PartialOrd for Sid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{SID_REVISION}-")?;
        if self.authority > u64::from(u32::MAX) {
            write!(f, "0x{:012X}", self.authority)?;
        } else {
            write!(f, "{}", self.authority)?;
        }
        for sub in &self.sub_authorities {
            write!(f, "-{sub}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sid({self})")
    }
}

impl FromStr for Sid {
    type Err = SddlError;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}
