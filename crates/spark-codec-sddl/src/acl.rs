//! 访问控制列表（ACL）。
//!
//! ## 教案目的（Why）
//! - 列表把若干条目按顺序串联，并在 8 字节头部中记录总长度与条目数；Windows 按顺序求值，因此本模块从不重排条目。
//!
//! ## 交互契约（What）
//! - 头部布局：`revision(1) | reserved(1) | size(2) | count(2) | reserved(2)`，均为小端。
//! - 总长度（头部 + 全部条目）恒不超过 65535；`insert_at`/`replace_at`/`push` 在提交前检查，超限返回 `OutOfRange` 且列表不变。
//! - 解码时，目录服务修订（4）按条目声明长度前进，以容忍 ADSI 多报长度；其他修订按真实长度前进。
//!
//! ## 实现策略（How）
//! - 解码前先把输入截断到列表声明长度，条目头部再做一次越界检查，任何越界都以 `MalformedList` 报告，
//!   不会落入条目层之外的索引错误。

use alloc::{string::String, vec::Vec};

use tracing::trace;

use crate::ace::{ACE_HEADER_LEN, Ace, MAX_ACE_LEN};
use crate::error::{Result, SddlError};
use crate::sddl::tokenizer;
use crate::wire;

/// 常规修订号。
pub const ACL_REVISION: u8 = 2;
/// 目录服务修订号（允许对象条目）。
pub const ACL_REVISION_DS: u8 = 4;
/// 列表头部长度。
pub const ACL_HEADER_LEN: usize = 8;
/// 列表二进制长度上限。
pub const MAX_ACL_LEN: usize = MAX_ACE_LEN;

/// 访问控制列表。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    revision: u8,
    entries: Vec<Ace>,
}

impl Acl {
    /// 构造空列表。
    #[must_use]
    pub const fn new(revision: u8) -> Self {
        Self {
            revision,
            entries: Vec::new(),
        }
    }

    /// 由条目序列构造；总长度超过 65535 时返回 `OutOfRange`。
    pub fn with_entries(revision: u8, entries: Vec<Ace>) -> Result<Self> {
        let len = ACL_HEADER_LEN + entries.iter().map(Ace::binary_len).sum::<usize>();
        check_ceiling(len)?;
        Ok(Self { revision, entries })
    }

    /// 从 `bytes[offset..]` 解码。
    pub fn from_bytes(bytes: &[u8], offset: usize) -> Result<Self> {
        let header = wire::slice(bytes, offset, ACL_HEADER_LEN)
            .ok_or(SddlError::list("剩余字节不足以容纳列表头部", offset))?;
        let revision = header[0];
        let declared = usize::from(u16::from_le_bytes([header[2], header[3]]));
        let count = usize::from(u16::from_le_bytes([header[4], header[5]]));

        let available = bytes.len() - offset;
        if declared > available {
            trace!(declared, available, offset, "列表声明长度越过缓冲");
            return Err(SddlError::list("列表声明长度越过缓冲", offset + 2));
        }
        if declared < ACL_HEADER_LEN {
            return Err(SddlError::list("列表声明长度小于头部", offset + 2));
        }

        let end = offset + declared;
        let scope = &bytes[..end];
        let mut entries = Vec::with_capacity(count.min(declared / ACE_HEADER_LEN));
        let mut cursor = offset + ACL_HEADER_LEN;
        let mut total = ACL_HEADER_LEN;
        for index in 0..count {
            let entry_declared = wire::read_u16(scope, cursor + 2)
                .map(usize::from)
                .ok_or(SddlError::list("条目头部越过列表声明长度", cursor))?;
            if cursor + entry_declared > end {
                trace!(index, entry_declared, cursor, end, "条目越过列表声明长度");
                return Err(SddlError::list("条目越过列表声明长度", cursor));
            }
            if entry_declared % 4 != 0 {
                return Err(SddlError::list("条目长度不是 4 的倍数", cursor + 2));
            }

            let ace = Ace::from_bytes(scope, cursor)?;
            total += ace.binary_len();
            if total > MAX_ACL_LEN {
                return Err(SddlError::list("列表总长度超过 65535", cursor));
            }
            cursor += if revision == ACL_REVISION_DS {
                entry_declared
            } else {
                ace.binary_len()
            };
            entries.push(ace);
        }
        Ok(Self { revision, entries })
    }

    /// 解析 `(tok)(tok)…` 形式的列表体；至少需要一个条目。
    ///
    /// 含对象条目时使用目录服务修订，否则使用常规修订。
    pub fn from_sddl(body: &str) -> Result<Self> {
        let tokens = tokenizer::split_entries(body)?;
        if tokens.is_empty() {
            return Err(SddlError::list("列表体为空", 0));
        }
        let entries = tokens
            .into_iter()
            .map(Ace::from_sddl)
            .collect::<Result<Vec<_>>>()?;
        let revision = if entries.iter().any(|ace| matches!(ace, Ace::Object(_))) {
            ACL_REVISION_DS
        } else {
            ACL_REVISION
        };
        Self::with_entries(revision, entries)
    }

    /// 渲染为 `(tok)(tok)…`；任一条目不可渲染时返回其错误。
    pub fn to_sddl(&self) -> Result<String> {
        let mut text = String::new();
        for ace in &self.entries {
            text.push('(');
            text.push_str(&ace.to_sddl()?);
            text.push(')');
        }
        Ok(text)
    }

    /// 修订号。
    #[must_use]
    pub fn revision(&self) -> u8 {
        self.revision
    }

    /// 条目数量。
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否没有条目。
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按下标取条目。
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Ace> {
        self.entries.get(index)
    }

    /// 按顺序遍历条目。
    pub fn iter(&self) -> core::slice::Iter<'_, Ace> {
        self.entries.iter()
    }

    /// 全部条目。
    #[must_use]
    pub fn entries(&self) -> &[Ace] {
        &self.entries
    }

    /// 在 `index` 处插入条目。
    pub fn insert_at(&mut self, index: usize, ace: Ace) -> Result<()> {
        if index > self.entries.len() {
            return Err(index_out_of_range(index, self.entries.len() + 1));
        }
        check_ceiling(self.binary_len() + ace.binary_len())?;
        self.entries.insert(index, ace);
        Ok(())
    }

    /// 追加条目。
    pub fn push(&mut self, ace: Ace) -> Result<()> {
        self.insert_at(self.entries.len(), ace)
    }

    /// 移除并返回 `index` 处的条目。
    pub fn remove_at(&mut self, index: usize) -> Result<Ace> {
        if index >= self.entries.len() {
            return Err(index_out_of_range(index, self.entries.len()));
        }
        Ok(self.entries.remove(index))
    }

    /// 替换 `index` 处的条目，返回旧条目。
    pub fn replace_at(&mut self, index: usize, ace: Ace) -> Result<Ace> {
        let current = self
            .entries
            .get(index)
            .ok_or_else(|| index_out_of_range(index, self.entries.len()))?
            .binary_len();
        check_ceiling(self.binary_len() - current + ace.binary_len())?;
        Ok(core::mem::replace(&mut self.entries[index], ace))
    }

    /// 二进制长度。
    #[must_use]
    pub fn binary_len(&self) -> usize {
        ACL_HEADER_LEN + self.entries.iter().map(Ace::binary_len).sum::<usize>()
    }

    /// 将二进制形式追加到 `out`。
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.revision);
        out.push(0);
        wire::put_u16(out, self.binary_len() as u16);
        wire::put_u16(out, self.entries.len() as u16);
        wire::put_u16(out, 0);
        for ace in &self.entries {
            ace.encode_into(out);
        }
    }

    /// 返回二进制形式。
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.binary_len());
        self.encode_into(&mut out);
        out
    }

    /// 写入 `buffer[offset..]`，返回写入字节数。
    pub fn write_to(&self, buffer: &mut [u8], offset: usize) -> Result<usize> {
        wire::copy_out(&self.to_bytes(), buffer, offset)
    }
}

impl<'a> IntoIterator for &'a Acl {
    type Item = &'a Ace;
    type IntoIter = core::slice::Iter<'a, Ace>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn check_ceiling(len: usize) -> Result<()> {
    if len > MAX_ACL_LEN {
        return Err(SddlError::OutOfRange {
            reason: "列表总长度",
            value: len as u64,
            limit: MAX_ACL_LEN as u64,
        });
    }
    Ok(())
}

/// `bound` 为开区间上界。
fn index_out_of_range(index: usize, bound: usize) -> SddlError {
    SddlError::OutOfRange {
        reason: "条目下标",
        value: index as u64,
        limit: bound.saturating_sub(1) as u64,
    }
}
