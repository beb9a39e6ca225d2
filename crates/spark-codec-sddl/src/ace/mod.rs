//! 访问控制条目（ACE）。
//!
//! ## 教案目的（Why）
//! - ACE 是访问列表的最小单元：由 4 字节头部（类型、标志、长度）加上变体相关的负载组成。
//! - 不同类型码决定负载布局，因此解码时先读头部，再按类型分派到具体变体。
//!
//! ## 交互契约（What）
//! - [`Ace`] 覆盖四种变体：[`CommonAce`]（普通/回调）、[`ObjectAce`]（带对象类型 GUID）、
//!   [`CompoundAce`]（模拟身份）与 [`CustomAce`]（未知类型码，仅保留原始负载）。
//! - 二进制长度总是 4 的倍数且不超过 65535；`binary_len()` 与 `encode_into()` 写出的字节数严格一致。
//! - SDDL 形式为六个以 `;` 分隔的字段：`type;flags;mask;objectGuid;inheritedObjectGuid;sid`。
//!
//! ## 实现策略（How）
//! - 头部解析集中在 [`Ace::from_bytes`]：先校验声明长度不越界且 4 字节对齐，再把输入截断到条目末尾交给变体，
//!   变体内部的读取因此不可能越过声明长度。
//! - 类型码与“限定符 + 回调 + 对象”三元组之间的映射集中在 [`AceType`]，SDDL 与二进制两条路径共用。
//!
//! ## 风险提示（Trade-offs）
//! - 非回调对象条目不携带附加数据；据此才能把“声明长度恰好多出 32 字节”识别为已知生产方缺陷。

mod common;
mod compound;
mod custom;
mod object;

use alloc::{string::String, vec::Vec};
use core::fmt::Write as _;

use bitflags::bitflags;
use tracing::{debug, trace};

use crate::error::{Result, SddlError};
use crate::guid::Guid;
use crate::sddl::{tables, tokenizer};
use crate::sid::Sid;
use crate::wire;

pub use self::{
    common::{CommonAce, MAX_COMMON_OPAQUE_LEN},
    compound::{CompoundAce, CompoundAceType},
    custom::{CustomAce, MAX_CUSTOM_OPAQUE_LEN},
    object::{MAX_OBJECT_OPAQUE_LEN, ObjectAce, ObjectAceFlags},
};

/// 条目头部长度。
pub const ACE_HEADER_LEN: usize = 4;
/// 条目二进制长度上限（16 位长度字段）。
pub const MAX_ACE_LEN: usize = u16::MAX as usize;

/// 已定义的条目类型码（0x00..=0x10）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum AceType {
    /// `A`
    AccessAllowed = 0x00,
    /// `D`
    AccessDenied = 0x01,
    /// `AU`
    SystemAudit = 0x02,
    /// `AL`
    SystemAlarm = 0x03,
    /// 复合（模拟身份）条目。
    AccessAllowedCompound = 0x04,
    /// `OA`
    AccessAllowedObject = 0x05,
    /// `OD`
    AccessDeniedObject = 0x06,
    /// `OU`
    SystemAuditObject = 0x07,
    /// `OL`
    SystemAlarmObject = 0x08,
    /// `XA`
    AccessAllowedCallback = 0x09,
    /// `XD`
    AccessDeniedCallback = 0x0A,
    /// `ZA`
    AccessAllowedCallbackObject = 0x0B,
    /// 无 SDDL 记号。
    AccessDeniedCallbackObject = 0x0C,
    /// `XU`
    SystemAuditCallback = 0x0D,
    /// 无 SDDL 记号。
    SystemAlarmCallback = 0x0E,
    /// 无 SDDL 记号。
    SystemAuditCallbackObject = 0x0F,
    /// 无 SDDL 记号。
    SystemAlarmCallbackObject = 0x10,
}

/// 已定义类型码的最大值；大于它的类型码一律视为自定义条目。
pub const MAX_DEFINED_ACE_TYPE: u8 = AceType::SystemAlarmCallbackObject as u8;

/// 条目限定符：允许、拒绝、审计或告警。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AceQualifier {
    /// 允许访问。
    AccessAllowed,
    /// 拒绝访问。
    AccessDenied,
    /// 系统审计。
    SystemAudit,
    /// 系统告警。
    SystemAlarm,
}

impl AceType {
    /// 从类型码还原；未定义的类型码返回 `None`。
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => Self::AccessAllowed,
            0x01 => Self::AccessDenied,
            0x02 => Self::SystemAudit,
            0x03 => Self::SystemAlarm,
            0x04 => Self::AccessAllowedCompound,
            0x05 => Self::AccessAllowedObject,
            0x06 => Self::AccessDeniedObject,
            0x07 => Self::SystemAuditObject,
            0x08 => Self::SystemAlarmObject,
            0x09 => Self::AccessAllowedCallback,
            0x0A => Self::AccessDeniedCallback,
            0x0B => Self::AccessAllowedCallbackObject,
            0x0C => Self::AccessDeniedCallbackObject,
            0x0D => Self::SystemAuditCallback,
            0x0E => Self::SystemAlarmCallback,
            0x0F => Self::SystemAuditCallbackObject,
            0x10 => Self::SystemAlarmCallbackObject,
            _ => return None,
        })
    }

    /// 类型码。
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// 由限定符、回调与对象属性组合出类型码。
    #[must_use]
    pub const fn from_parts(qualifier: AceQualifier, is_callback: bool, is_object: bool) -> Self {
        use AceQualifier as Q;
        match (qualifier, is_callback, is_object) {
            (Q::AccessAllowed, false, false) => Self::AccessAllowed,
            (Q::AccessDenied, false, false) => Self::AccessDenied,
            (Q::SystemAudit, false, false) => Self::SystemAudit,
            (Q::SystemAlarm, false, false) => Self::SystemAlarm,
            (Q::AccessAllowed, false, true) => Self::AccessAllowedObject,
            (Q::AccessDenied, false, true) => Self::AccessDeniedObject,
            (Q::SystemAudit, false, true) => Self::SystemAuditObject,
            (Q::SystemAlarm, false, true) => Self::SystemAlarmObject,
            (Q::AccessAllowed, true, false) => Self::AccessAllowedCallback,
            (Q::AccessDenied, true, false) => Self::AccessDeniedCallback,
            (Q::SystemAudit, true, false) => Self::SystemAuditCallback,
            (Q::SystemAlarm, true, false) => Self::SystemAlarmCallback,
            (Q::AccessAllowed, true, true) => Self::AccessAllowedCallbackObject,
            (Q::AccessDenied, true, true) => Self::AccessDeniedCallbackObject,
            (Q::SystemAudit, true, true) => Self::SystemAuditCallbackObject,
            (Q::SystemAlarm, true, true) => Self::SystemAlarmCallbackObject,
        }
    }

    /// 限定符；复合条目属于“允许”。
    #[must_use]
    pub const fn qualifier(self) -> AceQualifier {
        match self {
            Self::AccessAllowed
            | Self::AccessAllowedCompound
            | Self::AccessAllowedObject
            | Self::AccessAllowedCallback
            | Self::AccessAllowedCallbackObject => AceQualifier::AccessAllowed,
            Self::AccessDenied
            | Self::AccessDeniedObject
            | Self::AccessDeniedCallback
            | Self::AccessDeniedCallbackObject => AceQualifier::AccessDenied,
            Self::SystemAudit
            | Self::SystemAuditObject
            | Self::SystemAuditCallback
            | Self::SystemAuditCallbackObject => AceQualifier::SystemAudit,
            Self::SystemAlarm
            | Self::SystemAlarmObject
            | Self::SystemAlarmCallback
            | Self::SystemAlarmCallbackObject => AceQualifier::SystemAlarm,
        }
    }

    /// 是否为回调类型。
    #[must_use]
    pub const fn is_callback(self) -> bool {
        matches!(
            self,
            Self::AccessAllowedCallback
                | Self::AccessDeniedCallback
                | Self::AccessAllowedCallbackObject
                | Self::AccessDeniedCallbackObject
                | Self::SystemAuditCallback
                | Self::SystemAlarmCallback
                | Self::SystemAuditCallbackObject
                | Self::SystemAlarmCallbackObject
        )
    }

    /// 是否为对象类型（负载含对象标志与可选 GUID）。
    #[must_use]
    pub const fn is_object(self) -> bool {
        matches!(
            self,
            Self::AccessAllowedObject
                | Self::AccessDeniedObject
                | Self::SystemAuditObject
                | Self::SystemAlarmObject
                | Self::AccessAllowedCallbackObject
                | Self::AccessDeniedCallbackObject
                | Self::SystemAuditCallbackObject
                | Self::SystemAlarmCallbackObject
        )
    }
}

bitflags! {
    /// 条目头部的标志字节。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AceFlags: u8 {
        /// `OI`：子对象继承。
        const OBJECT_INHERIT = 0x01;
        /// `CI`：子容器继承。
        const CONTAINER_INHERIT = 0x02;
        /// `NP`：只向直接子项传播。
        const NO_PROPAGATE_INHERIT = 0x04;
        /// `IO`：只用于继承，不作用于自身。
        const INHERIT_ONLY = 0x08;
        /// `ID`：由父对象继承而来。
        const INHERITED = 0x10;
        /// `SA`：审计成功访问。
        const SUCCESSFUL_ACCESS = 0x40;
        /// `FA`：审计失败访问。
        const FAILED_ACCESS = 0x80;

        /// 继承相关位。
        const INHERITANCE = Self::OBJECT_INHERIT.bits() | Self::CONTAINER_INHERIT.bits();
        /// 传播相关位。
        const PROPAGATION = Self::NO_PROPAGATE_INHERIT.bits() | Self::INHERIT_ONLY.bits();
        /// 审计相关位。
        const AUDIT = Self::SUCCESSFUL_ACCESS.bits() | Self::FAILED_ACCESS.bits();
    }
}

bitflags! {
    /// 继承方式视图。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InheritanceFlags: u8 {
        /// 子容器继承。
        const CONTAINER_INHERIT = 0x01;
        /// 子对象继承。
        const OBJECT_INHERIT = 0x02;
    }
}

bitflags! {
    /// 传播方式视图。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropagationFlags: u8 {
        /// 只向直接子项传播。
        const NO_PROPAGATE_INHERIT = 0x01;
        /// 只用于继承。
        const INHERIT_ONLY = 0x02;
    }
}

bitflags! {
    /// 审计方式视图。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AuditFlags: u8 {
        /// 审计成功访问。
        const SUCCESS = 0x01;
        /// 审计失败访问。
        const FAILURE = 0x02;
    }
}

impl AceFlags {
    /// 由继承与传播视图组合；未设置任何继承位时传播位无意义，直接丢弃。
    #[must_use]
    pub fn from_inheritance(inheritance: InheritanceFlags, propagation: PropagationFlags) -> Self {
        let mut flags = Self::empty();
        flags.set(
            Self::CONTAINER_INHERIT,
            inheritance.contains(InheritanceFlags::CONTAINER_INHERIT),
        );
        flags.set(
            Self::OBJECT_INHERIT,
            inheritance.contains(InheritanceFlags::OBJECT_INHERIT),
        );
        if !inheritance.is_empty() {
            flags.set(
                Self::NO_PROPAGATE_INHERIT,
                propagation.contains(PropagationFlags::NO_PROPAGATE_INHERIT),
            );
            flags.set(
                Self::INHERIT_ONLY,
                propagation.contains(PropagationFlags::INHERIT_ONLY),
            );
        }
        flags
    }

    /// 由审计视图组合。
    #[must_use]
    pub fn from_audit(audit: AuditFlags) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::SUCCESSFUL_ACCESS, audit.contains(AuditFlags::SUCCESS));
        flags.set(Self::FAILED_ACCESS, audit.contains(AuditFlags::FAILURE));
        flags
    }

    /// 继承视图。
    #[must_use]
    pub fn inheritance(self) -> InheritanceFlags {
        let mut view = InheritanceFlags::empty();
        view.set(
            InheritanceFlags::CONTAINER_INHERIT,
            self.contains(Self::CONTAINER_INHERIT),
        );
        view.set(
            InheritanceFlags::OBJECT_INHERIT,
            self.contains(Self::OBJECT_INHERIT),
        );
        view
    }

    /// 传播视图。
    #[must_use]
    pub fn propagation(self) -> PropagationFlags {
        let mut view = PropagationFlags::empty();
        view.set(
            PropagationFlags::NO_PROPAGATE_INHERIT,
            self.contains(Self::NO_PROPAGATE_INHERIT),
        );
        view.set(
            PropagationFlags::INHERIT_ONLY,
            self.contains(Self::INHERIT_ONLY),
        );
        view
    }

    /// 审计视图。
    #[must_use]
    pub fn audit(self) -> AuditFlags {
        let mut view = AuditFlags::empty();
        view.set(AuditFlags::SUCCESS, self.contains(Self::SUCCESSFUL_ACCESS));
        view.set(AuditFlags::FAILURE, self.contains(Self::FAILED_ACCESS));
        view
    }
}

/// 访问控制条目。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ace {
    /// 普通或回调条目。
    Common(CommonAce),
    /// 对象条目。
    Object(ObjectAce),
    /// 复合条目。
    Compound(CompoundAce),
    /// 未知类型码的条目。
    Custom(CustomAce),
}

impl Ace {
    /// 从 `bytes[offset..]` 解码一个条目。
    ///
    /// - 头部不足 4 字节、声明长度越过缓冲或不是 4 的倍数时返回 `MalformedEntry`；
    /// - 变体负载只在声明长度之内读取。
    pub fn from_bytes(bytes: &[u8], offset: usize) -> Result<Self> {
        let header = wire::slice(bytes, offset, ACE_HEADER_LEN)
            .ok_or(SddlError::entry("剩余字节不足以容纳条目头部", offset))?;
        let code = header[0];
        let flags = AceFlags::from_bits_retain(header[1]);
        let declared = usize::from(u16::from_le_bytes([header[2], header[3]]));

        let available = bytes.len() - offset;
        if declared > available {
            trace!(declared, available, offset, "条目声明长度越过缓冲");
            return Err(SddlError::entry("条目声明长度越过缓冲", offset + 2));
        }
        if declared % 4 != 0 {
            return Err(SddlError::entry("条目长度不是 4 的倍数", offset + 2));
        }

        let entry = &bytes[..offset + declared];
        match AceType::from_u8(code) {
            None => CustomAce::decode(code, flags, entry, offset).map(Self::Custom),
            Some(AceType::AccessAllowedCompound) => {
                CompoundAce::decode(flags, entry, offset).map(Self::Compound)
            }
            Some(ace_type) if ace_type.is_object() => {
                ObjectAce::decode(ace_type, flags, entry, offset).map(Self::Object)
            }
            Some(ace_type) => CommonAce::decode(ace_type, flags, entry, offset).map(Self::Common),
        }
    }

    /// 原始类型码。
    #[must_use]
    pub fn type_code(&self) -> u8 {
        match self {
            Self::Common(ace) => ace.ace_type().as_u8(),
            Self::Object(ace) => ace.ace_type().as_u8(),
            Self::Compound(_) => AceType::AccessAllowedCompound.as_u8(),
            Self::Custom(ace) => ace.type_code(),
        }
    }

    /// 已定义的类型；自定义条目返回 `None`。
    #[must_use]
    pub fn ace_type(&self) -> Option<AceType> {
        AceType::from_u8(self.type_code())
    }

    /// 头部标志。
    #[must_use]
    pub fn flags(&self) -> AceFlags {
        match self {
            Self::Common(ace) => ace.flags(),
            Self::Object(ace) => ace.flags(),
            Self::Compound(ace) => ace.flags(),
            Self::Custom(ace) => ace.flags(),
        }
    }

    /// 替换头部标志。
    pub fn set_flags(&mut self, flags: AceFlags) {
        match self {
            Self::Common(ace) => ace.set_flags(flags),
            Self::Object(ace) => ace.set_flags(flags),
            Self::Compound(ace) => ace.set_flags(flags),
            Self::Custom(ace) => ace.set_flags(flags),
        }
    }

    /// 访问掩码；自定义条目没有掩码。
    #[must_use]
    pub fn access_mask(&self) -> Option<u32> {
        match self {
            Self::Common(ace) => Some(ace.access_mask()),
            Self::Object(ace) => Some(ace.access_mask()),
            Self::Compound(ace) => Some(ace.access_mask()),
            Self::Custom(_) => None,
        }
    }

    /// 主体标识符；自定义条目没有主体。
    #[must_use]
    pub fn sid(&self) -> Option<&Sid> {
        match self {
            Self::Common(ace) => Some(ace.sid()),
            Self::Object(ace) => Some(ace.sid()),
            Self::Compound(ace) => Some(ace.sid()),
            Self::Custom(_) => None,
        }
    }

    /// 附加数据；复合条目恒为空。
    #[must_use]
    pub fn opaque(&self) -> &[u8] {
        match self {
            Self::Common(ace) => ace.opaque(),
            Self::Object(ace) => ace.opaque(),
            Self::Compound(_) => &[],
            Self::Custom(ace) => ace.opaque(),
        }
    }

    /// 是否由父对象继承而来。
    #[must_use]
    pub fn is_inherited(&self) -> bool {
        self.flags().contains(AceFlags::INHERITED)
    }

    /// 继承视图。
    #[must_use]
    pub fn inheritance_flags(&self) -> InheritanceFlags {
        self.flags().inheritance()
    }

    /// 传播视图。
    #[must_use]
    pub fn propagation_flags(&self) -> PropagationFlags {
        self.flags().propagation()
    }

    /// 审计视图。
    #[must_use]
    pub fn audit_flags(&self) -> AuditFlags {
        self.flags().audit()
    }

    /// 二进制长度。
    #[must_use]
    pub fn binary_len(&self) -> usize {
        match self {
            Self::Common(ace) => ace.binary_len(),
            Self::Object(ace) => ace.binary_len(),
            Self::Compound(ace) => ace.binary_len(),
            Self::Custom(ace) => ace.binary_len(),
        }
    }

    /// 将二进制形式追加到 `out`。
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Common(ace) => ace.encode_into(out),
            Self::Object(ace) => ace.encode_into(out),
            Self::Compound(ace) => ace.encode_into(out),
            Self::Custom(ace) => ace.encode_into(out),
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

    /// 解析括号内的 SDDL 条目记号（不含括号）。
    ///
    /// 两个 GUID 字段都为空（或为全零 GUID）时得到普通条目，即便类型记号是对象类型；
    /// 反之只要有一个 GUID，就得到对象条目。
    pub fn from_sddl(token: &str) -> Result<Self> {
        let mut fields = token.split(';');
        let mut next = || fields.next().ok_or(SddlError::entry("条目记号必须包含六个字段", 0));
        let (type_text, flags_text, mask_text) = (next()?, next()?, next()?);
        let (object_text, inherited_text, sid_text) = (next()?, next()?, next()?);
        if fields.next().is_some() {
            return Err(SddlError::entry("条目记号必须包含六个字段", token.len()));
        }

        let ace_type = tables::ace_type_from_token(type_text)
            .ok_or(SddlError::entry("未知的条目类型记号", 0))?;
        if ace_type == AceType::AccessAllowedCompound {
            return Err(SddlError::NotSupported {
                reason: "复合条目没有 SDDL 形式",
                code: u32::from(ace_type.as_u8()),
            });
        }
        let flags = tokenizer::scan_tokens(flags_text, tables::ACE_FLAG_TOKENS)
            .ok_or(SddlError::entry("未知的条目标志记号", 0))?
            .into_iter()
            .fold(AceFlags::empty(), |acc, flag| acc | flag);
        let access_mask = parse_access_mask(mask_text)?;
        let object_type = parse_optional_guid(object_text)?;
        let inherited_object_type = parse_optional_guid(inherited_text)?;
        let sid = Sid::parse(sid_text)?;

        let qualifier = ace_type.qualifier();
        let is_callback = ace_type.is_callback();
        if object_type.is_none() && inherited_object_type.is_none() {
            CommonAce::new(flags, qualifier, access_mask, sid, is_callback, Vec::new())
                .map(Self::Common)
        } else {
            ObjectAce::new(
                flags,
                qualifier,
                access_mask,
                sid,
                object_type,
                inherited_object_type,
                is_callback,
                Vec::new(),
            )
            .map(Self::Object)
        }
    }

    /// 渲染为 SDDL 条目记号（不含括号）。
    ///
    /// 复合与自定义条目、以及没有 SDDL 类型记号的类型返回 `NotSupported`；附加数据不出现在文本中。
    pub fn to_sddl(&self) -> Result<String> {
        let (ace_type, access_mask, sid, object_type, inherited_object_type) = match self {
            Self::Common(ace) => (ace.ace_type(), ace.access_mask(), ace.sid(), None, None),
            Self::Object(ace) => {
                let (object_type, inherited) = (ace.object_type(), ace.inherited_object_type());
                // 不带 GUID 的对象条目按对应的普通类型输出。
                let ace_type = if object_type.is_none() && inherited.is_none() {
                    AceType::from_parts(ace.qualifier(), ace.is_callback(), false)
                } else {
                    ace.ace_type()
                };
                (ace_type, ace.access_mask(), ace.sid(), object_type, inherited)
            }
            Self::Compound(_) | Self::Custom(_) => {
                return Err(SddlError::NotSupported {
                    reason: "该条目变体没有 SDDL 形式",
                    code: u32::from(self.type_code()),
                });
            }
        };

        let type_token = tables::ace_type_token(ace_type).ok_or(SddlError::NotSupported {
            reason: "该条目类型没有 SDDL 记号",
            code: u32::from(ace_type.as_u8()),
        })?;

        let mut text = String::new();
        text.push_str(type_token);
        text.push(';');
        let flags = self.flags();
        let mut rendered = AceFlags::empty();
        for (token, flag) in tables::ACE_FLAG_TOKENS {
            if flags.contains(*flag) {
                text.push_str(token);
                rendered |= *flag;
            }
        }
        let dropped = flags.bits() & !rendered.bits();
        if dropped != 0 {
            debug!(flags = flags.bits(), dropped, "条目标志含无 SDDL 记号的位，渲染时省略");
        }
        let _ = write!(text, ";0x{access_mask:x};");
        if let Some(guid) = object_type {
            let _ = write!(text, "{guid}");
        }
        text.push(';');
        if let Some(guid) = inherited_object_type {
            let _ = write!(text, "{guid}");
        }
        let _ = write!(text, ";{sid}");
        Ok(text)
    }
}

impl From<CommonAce> for Ace {
    fn from(ace: CommonAce) -> Self {
        Self::Common(ace)
    }
}

impl From<ObjectAce> for Ace {
    fn from(ace: ObjectAce) -> Self {
        Self::Object(ace)
    }
}

impl From<CompoundAce> for Ace {
    fn from(ace: CompoundAce) -> Self {
        Self::Compound(ace)
    }
}

impl From<CustomAce> for Ace {
    fn from(ace: CustomAce) -> Self {
        Self::Custom(ace)
    }
}

/// 掩码字段：空 ⇒ 0；`0x` 前缀 ⇒ 十六进制；否则先按权限记号拼接解析，再退回无前缀十六进制。
fn parse_access_mask(text: &str) -> Result<u32> {
    if text.is_empty() {
        return Ok(0);
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16)
            .map_err(|_| SddlError::entry("访问掩码不是 32 位十六进制数", 0));
    }
    if let Some(rights) = tokenizer::scan_tokens(text, tables::RIGHTS_TOKENS) {
        return Ok(rights.into_iter().fold(0, |acc, right| acc | right));
    }
    u32::from_str_radix(text, 16).map_err(|_| SddlError::entry("无法识别的访问掩码", 0))
}

fn parse_optional_guid(text: &str) -> Result<Option<Guid>> {
    if text.is_empty() {
        return Ok(None);
    }
    let guid = Guid::parse(text)?;
    Ok((!guid.is_nil()).then_some(guid))
}

/// 写出条目头部。
pub(crate) fn encode_header(out: &mut Vec<u8>, type_code: u8, flags: AceFlags, len: usize) {
    out.push(type_code);
    out.push(flags.bits());
    wire::put_u16(out, len as u16);
}

/// 校验附加数据长度：4 字节对齐且不超过变体上限。
pub(crate) fn check_opaque_len(len: usize, limit: usize) -> Result<()> {
    if len > limit {
        return Err(SddlError::OutOfRange {
            reason: "附加数据长度",
            value: len as u64,
            limit: limit as u64,
        });
    }
    if len % 4 != 0 {
        return Err(SddlError::OutOfRange {
            reason: "附加数据长度必须是 4 的倍数",
            value: len as u64,
            limit: limit as u64,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sid::WellKnownSidKind;
    use alloc::vec;

    fn sid(kind: WellKnownSidKind) -> Sid {
        Sid::from_well_known(kind, None).expect("固定知名种类应可构造")
    }

    #[test]
    fn type_parts_round_trip() {
        for code in 0..=MAX_DEFINED_ACE_TYPE {
            let ace_type = AceType::from_u8(code).expect("0x00..=0x10 均已定义");
            if ace_type == AceType::AccessAllowedCompound {
                continue;
            }
            let rebuilt = AceType::from_parts(
                ace_type.qualifier(),
                ace_type.is_callback(),
                ace_type.is_object(),
            );
            assert_eq!(rebuilt, ace_type, "类型码 {code:#04x}");
        }
        assert_eq!(AceType::from_u8(0x11), None);
    }

    #[test]
    fn application_package_callback_token() {
        let ace = Ace::from_sddl("XA;OICI;0x1200a9;;;AC").expect("回调条目应可解析");
        let Ace::Common(common) = &ace else {
            panic!("无 GUID 时应为普通条目：{ace:?}");
        };
        assert_eq!(common.ace_type(), AceType::AccessAllowedCallback);
        assert!(common.is_callback());
        assert_eq!(
            common.flags(),
            AceFlags::CONTAINER_INHERIT | AceFlags::OBJECT_INHERIT
        );
        assert_eq!(common.access_mask(), 0x0012_00a9);
        assert_eq!(common.sid(), &sid(WellKnownSidKind::BuiltinAnyPackage));
        assert_eq!(
            ace.to_sddl().expect("回调允许条目有 XA 记号"),
            "XA;CIOI;0x1200a9;;;S-1-15-2-1"
        );
    }

    #[test]
    fn object_token_without_guid_is_common() {
        let ace = Ace::from_sddl("OA;;RPWP;;;SY").expect("对象类型记号应可解析");
        assert!(matches!(ace, Ace::Common(_)));
        assert_eq!(ace.ace_type(), Some(AceType::AccessAllowed));
        assert_eq!(ace.access_mask(), Some(0x30));
    }

    #[test]
    fn guid_makes_object_entry() {
        let ace = Ace::from_sddl("OA;CI;CR;00299570-246d-11d0-a768-00aa006e0529;;WD")
            .expect("对象条目应可解析");
        let Ace::Object(object) = &ace else {
            panic!("带 GUID 时应为对象条目：{ace:?}");
        };
        assert!(object.object_type().is_some());
        assert!(object.inherited_object_type().is_none());
        assert_eq!(
            ace.to_sddl().expect("OA 有记号"),
            "OA;CI;0x100;00299570-246d-11d0-a768-00aa006e0529;;S-1-1-0"
        );
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for token in [
            "A;;FA;;BA",
            "A;;FA;;;BA;",
            "Q;;FA;;;BA",
            "A;XX;FA;;;BA",
            "A;;ZZ;;;BA",
            "A;;FA;not-a-guid;;BA",
            "A;;0x100000000;;;BA",
        ] {
            let err = Ace::from_sddl(token).expect_err(token);
            assert_eq!(err.kind(), crate::ErrorKind::MalformedEntry, "{token}");
        }
    }

    #[test]
    fn mask_accepts_hex_and_tokens() {
        assert_eq!(parse_access_mask(""), Ok(0));
        assert_eq!(parse_access_mask("FA"), Ok(0x001F_01FF));
        assert_eq!(parse_access_mask("GAGR"), Ok(0x9000_0000));
        assert_eq!(parse_access_mask("0X1f"), Ok(0x1f));
        assert_eq!(parse_access_mask("1200a9"), Ok(0x0012_00a9));
    }

    #[test]
    fn mandatory_label_tokens_resolve_to_platform_masks() {
        for (text, mask) in [
            ("A;;NW;;;SY", 0x1),
            ("A;;NR;;;SY", 0x2),
            ("A;;NX;;;SY", 0x4),
            ("A;;NWNR;;;SY", 0x3),
        ] {
            let ace = Ace::from_sddl(text).expect(text);
            assert_eq!(ace.access_mask(), Some(mask), "{text}");
        }
    }

    #[test]
    #[tracing_test::traced_test]
    fn untokenized_flag_bits_are_logged_when_rendering() {
        let mut bytes = Ace::from_sddl("A;CI;FA;;;BA").expect("合法").to_bytes();
        bytes[1] |= 0x20;
        let ace = Ace::from_bytes(&bytes, 0).expect("未定义标志位可解码");

        let text = ace.to_sddl().expect("普通条目可渲染");
        assert!(text.starts_with("A;CI;"), "{text}");
        assert!(logs_contain("渲染时省略"));
    }

    #[test]
    fn compound_and_custom_have_no_text_form() {
        let compound = CompoundAce::new(
            AceFlags::empty(),
            0x1,
            CompoundAceType::Impersonation,
            sid(WellKnownSidKind::LocalSystem),
        );
        let err = Ace::from(compound).to_sddl().expect_err("复合条目不可渲染");
        assert_eq!(err.kind(), crate::ErrorKind::NotSupported);

        let custom = CustomAce::new(0x42, AceFlags::empty(), vec![1, 2, 3, 4]).expect("类型码合法");
        assert!(Ace::from(custom).to_sddl().is_err());
    }

    #[test]
    fn header_is_validated_before_dispatch() {
        let ace = Ace::from_sddl("A;;FA;;;BA").expect("合法");
        let mut bytes = ace.to_bytes();
        assert_eq!(Ace::from_bytes(&bytes, 0), Ok(ace.clone()));

        bytes[2] = 0xFF;
        let err = Ace::from_bytes(&bytes, 0).expect_err("声明长度越界");
        assert_eq!(err.kind(), crate::ErrorKind::MalformedEntry);

        let mut unaligned = ace.to_bytes();
        unaligned[2] -= 2;
        assert!(Ace::from_bytes(&unaligned, 0).is_err());
        assert!(Ace::from_bytes(&[0, 0, 8], 0).is_err());
    }

    #[test]
    fn flag_views_compose() {
        let flags = AceFlags::from_inheritance(
            InheritanceFlags::CONTAINER_INHERIT,
            PropagationFlags::INHERIT_ONLY,
        );
        assert_eq!(flags, AceFlags::CONTAINER_INHERIT | AceFlags::INHERIT_ONLY);
        assert_eq!(flags.propagation(), PropagationFlags::INHERIT_ONLY);
        assert_eq!(
            AceFlags::from_inheritance(InheritanceFlags::empty(), PropagationFlags::all()),
            AceFlags::empty()
        );
        assert_eq!(
            AceFlags::from_audit(AuditFlags::FAILURE).audit(),
            AuditFlags::FAILURE
        );
    }
}
