//! 对象条目：`header | mask(4) | object_flags(4) | [object_type(16)] | [inherited_object_type(16)] | sid | opaque`。
//!
//! ## 教案目的（Why）
//! - 目录服务用对象条目把权限限定到某个属性集或子对象类；GUID 是否出现由对象标志位决定。
//!
//! ## 风险提示（Trade-offs）
//! - 旧版 ADSI 写出的非回调对象条目会把长度字段多报 32 字节（为两个 GUID 预留的空间）。
//!   解码时容忍这一差值，编码时总是写出真实长度；容忍只对非回调条目生效，
//!   因为回调条目的尾部本来就是合法的附加数据。

use alloc::vec::Vec;

use bitflags::bitflags;
use tracing::debug;

use super::{
    ACE_HEADER_LEN, AceFlags, AceQualifier, AceType, MAX_ACE_LEN, check_opaque_len,
    encode_header,
};
use crate::error::{Result, SddlError};
use crate::guid::{GUID_LEN, Guid};
use crate::sid::{self, Sid};
use crate::wire;

bitflags! {
    /// 对象条目的 GUID 存在标志。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ObjectAceFlags: u32 {
        /// 携带对象类型 GUID。
        const OBJECT_TYPE_PRESENT = 0x1;
        /// 携带继承对象类型 GUID。
        const INHERITED_OBJECT_TYPE_PRESENT = 0x2;
    }
}

/// 附加数据上限：`65535 - 头部 - 掩码 - 对象标志 - 两个 GUID - 最长 SID`；仅回调对象条目可用。
pub const MAX_OBJECT_OPAQUE_LEN: usize =
    MAX_ACE_LEN - ACE_HEADER_LEN - 4 - 4 - 2 * GUID_LEN - sid::MAX_BINARY_LEN;

/// ADSI 缺陷多报的字节数。
const ADSI_LENGTH_SURPLUS: usize = 2 * GUID_LEN;

const fn max_opaque_len(is_callback: bool) -> usize {
    if is_callback { MAX_OBJECT_OPAQUE_LEN } else { 0 }
}

/// 对象条目（类型码 0x05..=0x08 及其回调形式 0x0B/0x0C/0x0F/0x10）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectAce {
    flags: AceFlags,
    qualifier: AceQualifier,
    is_callback: bool,
    access_mask: u32,
    sid: Sid,
    object_type: Option<Guid>,
    inherited_object_type: Option<Guid>,
    /// 线上读到的未定义对象标志位，编码时原样写回。
    reserved_flags: u32,
    opaque: Vec<u8>,
}

impl ObjectAce {
    /// 构造对象条目。
    ///
    /// 非回调对象条目不接受附加数据；回调对象条目的附加数据须 4 字节对齐且不超过 [`MAX_OBJECT_OPAQUE_LEN`]。
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        flags: AceFlags,
        qualifier: AceQualifier,
        access_mask: u32,
        sid: Sid,
        object_type: Option<Guid>,
        inherited_object_type: Option<Guid>,
        is_callback: bool,
        opaque: Vec<u8>,
    ) -> Result<Self> {
        check_opaque_len(opaque.len(), max_opaque_len(is_callback))?;
        Ok(Self {
            flags,
            qualifier,
            is_callback,
            access_mask,
            sid,
            object_type,
            inherited_object_type,
            reserved_flags: 0,
            opaque,
        })
    }

    pub(super) fn decode(
        ace_type: AceType,
        flags: AceFlags,
        entry: &[u8],
        offset: usize,
    ) -> Result<Self> {
        let declared = entry.len() - offset;
        let access_mask = wire::read_u32(entry, offset + ACE_HEADER_LEN)
            .ok_or(SddlError::entry("对象条目过短，缺少访问掩码", offset))?;
        let raw_flags = wire::read_u32(entry, offset + ACE_HEADER_LEN + 4)
            .ok_or(SddlError::entry("对象条目过短，缺少对象标志", offset))?;
        let object_flags = ObjectAceFlags::from_bits_retain(raw_flags);
        let reserved_flags = raw_flags & !ObjectAceFlags::all().bits();
        if reserved_flags != 0 {
            debug!(raw_flags, offset, "对象标志含未定义位，原样保留");
        }

        let mut cursor = offset + ACE_HEADER_LEN + 8;
        let mut read_guid = |present: bool| -> Result<Option<Guid>> {
            if !present {
                return Ok(None);
            }
            let raw = wire::slice(entry, cursor, GUID_LEN)
                .ok_or(SddlError::entry("对象类型 GUID 被截断", cursor))?;
            cursor += GUID_LEN;
            let mut packed = [0u8; GUID_LEN];
            packed.copy_from_slice(raw);
            Ok(Some(Guid::from_bytes_le(&packed)))
        };
        let object_type = read_guid(object_flags.contains(ObjectAceFlags::OBJECT_TYPE_PRESENT))?;
        let inherited_object_type =
            read_guid(object_flags.contains(ObjectAceFlags::INHERITED_OBJECT_TYPE_PRESENT))?;

        let sid = Sid::from_bytes(entry, cursor)?;
        let fixed = cursor - offset + sid.binary_len();
        let surplus = &entry[offset + fixed..];

        let is_callback = ace_type.is_callback();
        let opaque = if is_callback {
            if surplus.len() > MAX_OBJECT_OPAQUE_LEN {
                return Err(SddlError::entry("附加数据超过上限", offset + fixed));
            }
            surplus.to_vec()
        } else if surplus.is_empty() {
            Vec::new()
        } else if surplus.len() == ADSI_LENGTH_SURPLUS {
            debug!(
                declared,
                actual = fixed,
                offset,
                "对象条目声明长度比实际多 32 字节，按已知 ADSI 缺陷容忍"
            );
            Vec::new()
        } else {
            return Err(SddlError::entry("对象条目声明长度与实际长度不符", offset + 2));
        };

        Ok(Self {
            flags,
            qualifier: ace_type.qualifier(),
            is_callback,
            access_mask,
            sid,
            object_type,
            inherited_object_type,
            reserved_flags,
            opaque,
        })
    }

    /// 类型码。
    #[must_use]
    pub fn ace_type(&self) -> AceType {
        AceType::from_parts(self.qualifier, self.is_callback, true)
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

    /// 对象标志：GUID 存在位由字段推导，其余位为解码时保留的未定义位。
    #[must_use]
    pub fn object_flags(&self) -> ObjectAceFlags {
        let mut flags = ObjectAceFlags::from_bits_retain(self.reserved_flags);
        flags.set(
            ObjectAceFlags::OBJECT_TYPE_PRESENT,
            self.object_type.is_some(),
        );
        flags.set(
            ObjectAceFlags::INHERITED_OBJECT_TYPE_PRESENT,
            self.inherited_object_type.is_some(),
        );
        flags
    }

    /// 对象类型 GUID。
    #[must_use]
    pub fn object_type(&self) -> Option<Guid> {
        self.object_type
    }

    /// 替换对象类型 GUID。
    pub fn set_object_type(&mut self, object_type: Option<Guid>) {
        self.object_type = object_type;
    }

    /// 继承对象类型 GUID。
    #[must_use]
    pub fn inherited_object_type(&self) -> Option<Guid> {
        self.inherited_object_type
    }

    /// 替换继承对象类型 GUID。
    pub fn set_inherited_object_type(&mut self, inherited_object_type: Option<Guid>) {
        self.inherited_object_type = inherited_object_type;
    }

    /// 两个 GUID 的存在性与取值是否都与给定值一致。
    #[must_use]
    pub fn object_types_match(
        &self,
        object_type: Option<Guid>,
        inherited_object_type: Option<Guid>,
    ) -> bool {
        self.object_type == object_type && self.inherited_object_type == inherited_object_type
    }

    /// 附加数据。
    #[must_use]
    pub fn opaque(&self) -> &[u8] {
        &self.opaque
    }

    /// 替换附加数据；违反长度约束时返回 `OutOfRange` 且保持原值。
    pub fn set_opaque(&mut self, opaque: Vec<u8>) -> Result<()> {
        check_opaque_len(opaque.len(), max_opaque_len(self.is_callback))?;
        self.opaque = opaque;
        Ok(())
    }

    /// 二进制长度（真实长度，不含 ADSI 多报部分）。
    #[must_use]
    pub fn binary_len(&self) -> usize {
        let guids = usize::from(self.object_type.is_some()) + usize::from(self.inherited_object_type.is_some());
        ACE_HEADER_LEN + 4 + 4 + guids * GUID_LEN + self.sid.binary_len() + self.opaque.len()
    }

    /// 将二进制形式追加到 `out`。
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        encode_header(out, self.ace_type().as_u8(), self.flags, self.binary_len());
        wire::put_u32(out, self.access_mask);
        wire::put_u32(out, self.object_flags().bits());
        for guid in [self.object_type, self.inherited_object_type].into_iter().flatten() {
            out.extend_from_slice(&guid.to_bytes_le());
        }
        self.sid.encode_into(out);
        out.extend_from_slice(&self.opaque);
    }
}
