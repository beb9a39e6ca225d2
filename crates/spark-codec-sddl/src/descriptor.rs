//! 自相对安全描述符。
//!
//! ## 教案目的（Why）
//! - 描述符把所有者、主组、系统访问列表（SACL）与自主访问列表（DACL）打包为一个连续字节块，
//!   是文件系统与目录服务持久化权限的最终形态。
//!
//! ## 交互契约（What）
//! - 头部 20 字节：`revision(1)=1 | rm_control(1) | control(2) | owner_off(4) | group_off(4) | sacl_off(4) | dacl_off(4)`；
//!   偏移相对描述符起点，0 表示字段缺失。
//! - 只支持自相对格式：解码时缺少 `SELF_RELATIVE` 返回 `UnsupportedForm`，编码时总是置位。
//! - 子结构按 所有者 → 主组 → SACL → DACL 的顺序紧随头部写出。
//!
//! ## 实现策略（How）
//! - 控制标志在每次修改后归一化：存在的列表置位其存在位，合成 DACL 清除 `DACL_PRESENT`，
//!   `RM_CONTROL_VALID` 跟随资源管理器控制字节；缺失的列表保留调用方或线上给出的存在位（即“空 DACL”编码）。
//! - DACL 使用三态 [`DaclState`]：合成的“所有人完全访问”列表在编码时视为缺失，一旦通过 [`SecurityDescriptor::dacl_mut`]
//!   取得可变访问即转为普通列表。
//!
//! ## 风险提示（Trade-offs）
//! - 合成 DACL 不参与二进制往返：编码后再解码得到的是缺失状态。

use alloc::{string::String, vec::Vec};

use bitflags::bitflags;
use tracing::trace;

use crate::ace::{Ace, AceFlags, AceQualifier, CommonAce};
use crate::acl::{ACL_REVISION, ACL_REVISION_DS, Acl};
use crate::error::{Result, SddlError};
use crate::sddl::{self, Sections};
use crate::sid::{Sid, WellKnownSidKind};
use crate::wire;

/// 描述符修订号。
pub const DESCRIPTOR_REVISION: u8 = 1;
/// 描述符头部长度。
pub const DESCRIPTOR_HEADER_LEN: usize = 20;

const OWNER_SLOT: usize = 4;
const GROUP_SLOT: usize = 8;
const SACL_SLOT: usize = 12;
const DACL_SLOT: usize = 16;

bitflags! {
    /// 描述符控制标志。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControlFlags: u16 {
        /// 所有者由默认机制提供。
        const OWNER_DEFAULTED = 0x0001;
        /// 主组由默认机制提供。
        const GROUP_DEFAULTED = 0x0002;
        /// 存在 DACL（偏移为 0 时表示空 DACL）。
        const DACL_PRESENT = 0x0004;
        /// DACL 由默认机制提供。
        const DACL_DEFAULTED = 0x0008;
        /// 存在 SACL。
        const SACL_PRESENT = 0x0010;
        /// SACL 由默认机制提供。
        const SACL_DEFAULTED = 0x0020;
        /// DACL 不可信。
        const DACL_UNTRUSTED = 0x0040;
        /// 服务器安全。
        const SERVER_SECURITY = 0x0080;
        /// `AR`：DACL 需要自动继承。
        const DACL_AUTO_INHERIT_REQ = 0x0100;
        /// `AR`：SACL 需要自动继承。
        const SACL_AUTO_INHERIT_REQ = 0x0200;
        /// `AI`：DACL 已自动继承。
        const DACL_AUTO_INHERITED = 0x0400;
        /// `AI`：SACL 已自动继承。
        const SACL_AUTO_INHERITED = 0x0800;
        /// `P`：DACL 受保护，不再继承。
        const DACL_PROTECTED = 0x1000;
        /// `P`：SACL 受保护，不再继承。
        const SACL_PROTECTED = 0x2000;
        /// 资源管理器控制字节有效。
        const RM_CONTROL_VALID = 0x4000;
        /// 自相对格式。
        const SELF_RELATIVE = 0x8000;
    }
}

/// DACL 的三种状态。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaclState {
    /// 没有 DACL。
    Absent,
    /// 普通 DACL。
    Present(Acl),
    /// 为缺失的 DACL 合成的“所有人完全访问”列表；编码时视为缺失。
    SyntheticEveryoneFullAccess(Acl),
}

impl DaclState {
    /// 列表本体（合成列表也会返回）。
    #[must_use]
    pub fn acl(&self) -> Option<&Acl> {
        match self {
            Self::Absent => None,
            Self::Present(acl) | Self::SyntheticEveryoneFullAccess(acl) => Some(acl),
        }
    }

    /// 是否为合成列表。
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::SyntheticEveryoneFullAccess(_))
    }
}

/// 自相对安全描述符。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityDescriptor {
    control: ControlFlags,
    owner: Option<Sid>,
    group: Option<Sid>,
    sacl: Option<Acl>,
    dacl: DaclState,
    rm_control: Option<u8>,
}

impl Default for SecurityDescriptor {
    fn default() -> Self {
        Self::new(ControlFlags::empty(), None, None, None, None)
    }
}

impl SecurityDescriptor {
    /// 构造描述符；`SELF_RELATIVE` 与列表存在位按归一化规则自动设置。
    #[must_use]
    pub fn new(
        flags: ControlFlags,
        owner: Option<Sid>,
        group: Option<Sid>,
        sacl: Option<Acl>,
        dacl: Option<Acl>,
    ) -> Self {
        let mut descriptor = Self {
            control: flags,
            owner,
            group,
            sacl,
            dacl: dacl.map_or(DaclState::Absent, DaclState::Present),
            rm_control: None,
        };
        descriptor.normalize();
        descriptor
    }

    pub(crate) fn from_parts(
        control: ControlFlags,
        owner: Option<Sid>,
        group: Option<Sid>,
        sacl: Option<Acl>,
        dacl: DaclState,
        rm_control: Option<u8>,
    ) -> Self {
        let mut descriptor = Self {
            control,
            owner,
            group,
            sacl,
            dacl,
            rm_control,
        };
        descriptor.normalize();
        descriptor
    }

    /// 从 `bytes[offset..]` 解码。
    ///
    /// 头部校验 → 确认自相对 → 分别解析四个子结构；任何一步失败都放弃整个描述符。
    pub fn from_bytes(bytes: &[u8], offset: usize) -> Result<Self> {
        let header = wire::slice(bytes, offset, DESCRIPTOR_HEADER_LEN)
            .ok_or(SddlError::descriptor("剩余字节不足以容纳描述符头部", offset))?;
        if header[0] != DESCRIPTOR_REVISION {
            trace!(revision = header[0], offset, "拒绝未知的描述符修订号");
            return Err(SddlError::descriptor("描述符修订号必须为 1", offset));
        }
        let rm_byte = header[1];
        let control = ControlFlags::from_bits_retain(u16::from_le_bytes([header[2], header[3]]));
        if !control.contains(ControlFlags::SELF_RELATIVE) {
            return Err(SddlError::unsupported(
                "只支持自相对格式的描述符",
                "absolute",
            ));
        }

        let slot = |at: usize| read_slot(header, offset, at);

        let owner = slot(OWNER_SLOT)?
            .map(|at| Sid::from_bytes(bytes, at))
            .transpose()?;
        let group = slot(GROUP_SLOT)?
            .map(|at| Sid::from_bytes(bytes, at))
            .transpose()?;
        let sacl = present_list(bytes, control, ControlFlags::SACL_PRESENT, slot(SACL_SLOT)?)?;
        let dacl = present_list(bytes, control, ControlFlags::DACL_PRESENT, slot(DACL_SLOT)?)?;
        let rm_control = control
            .contains(ControlFlags::RM_CONTROL_VALID)
            .then_some(rm_byte);
        trace!(offset, control = control.bits(), "描述符解码完成");

        Ok(Self::from_parts(
            control,
            owner,
            group,
            sacl,
            dacl.map_or(DaclState::Absent, DaclState::Present),
            rm_control,
        ))
    }

    /// 解析 SDDL 文本。
    pub fn from_sddl(text: &str) -> Result<Self> {
        sddl::parse_descriptor(text)
    }

    /// 按 `sections` 渲染 SDDL 文本；每节还要求对应字段存在。
    pub fn to_sddl(&self, sections: Sections) -> Result<String> {
        sddl::render_descriptor(self, sections)
    }

    /// 归一化后的控制标志。
    #[must_use]
    pub fn control_flags(&self) -> ControlFlags {
        self.control
    }

    /// 替换控制标志；`SELF_RELATIVE` 总是置位，列表存在位随后按归一化规则修正。
    pub fn set_flags(&mut self, flags: ControlFlags) {
        self.control = flags | ControlFlags::SELF_RELATIVE;
        self.normalize();
    }

    /// 所有者。
    #[must_use]
    pub fn owner(&self) -> Option<&Sid> {
        self.owner.as_ref()
    }

    /// 替换所有者。
    pub fn set_owner(&mut self, owner: Option<Sid>) {
        self.owner = owner;
    }

    /// 主组。
    #[must_use]
    pub fn group(&self) -> Option<&Sid> {
        self.group.as_ref()
    }

    /// 替换主组。
    pub fn set_group(&mut self, group: Option<Sid>) {
        self.group = group;
    }

    /// 系统访问列表。
    #[must_use]
    pub fn sacl(&self) -> Option<&Acl> {
        self.sacl.as_ref()
    }

    /// 系统访问列表的可变引用。
    pub fn sacl_mut(&mut self) -> Option<&mut Acl> {
        self.sacl.as_mut()
    }

    /// 替换系统访问列表；置为 `None` 同时清除 `SACL_PRESENT`。
    pub fn set_sacl(&mut self, sacl: Option<Acl>) {
        if sacl.is_none() {
            self.control.remove(ControlFlags::SACL_PRESENT);
        }
        self.sacl = sacl;
        self.normalize();
    }

    /// 自主访问列表（合成列表同样返回）。
    #[must_use]
    pub fn dacl(&self) -> Option<&Acl> {
        self.dacl.acl()
    }

    /// DACL 的三态视图。
    #[must_use]
    pub fn dacl_state(&self) -> &DaclState {
        &self.dacl
    }

    /// 取得 DACL 的可变引用；合成列表在此转为普通列表。
    pub fn dacl_mut(&mut self) -> Option<&mut Acl> {
        if self.dacl.is_synthetic() {
            trace!("合成 DACL 被修改，转为普通 DACL");
            if let DaclState::SyntheticEveryoneFullAccess(acl) =
                core::mem::replace(&mut self.dacl, DaclState::Absent)
            {
                self.dacl = DaclState::Present(acl);
            }
            self.normalize();
        }
        match &mut self.dacl {
            DaclState::Present(acl) => Some(acl),
            DaclState::Absent | DaclState::SyntheticEveryoneFullAccess(_) => None,
        }
    }

    /// 替换自主访问列表；置为 `None` 同时清除 `DACL_PRESENT`。
    pub fn set_dacl(&mut self, dacl: Option<Acl>) {
        self.dacl = match dacl {
            Some(acl) => DaclState::Present(acl),
            None => {
                self.control.remove(ControlFlags::DACL_PRESENT);
                DaclState::Absent
            }
        };
        self.normalize();
    }

    /// 为缺失的 DACL 合成“所有人完全访问”列表；已有 DACL 时不做任何事并返回 `false`。
    ///
    /// 合成列表：允许 `S-1-1-0` 掩码 `0xFFFFFFFF`，容器对象附加 `OI|CI`；目录服务对象使用修订 4。
    pub fn synthesize_null_dacl(&mut self, is_ds: bool, is_container: bool) -> Result<bool> {
        if !matches!(self.dacl, DaclState::Absent) {
            return Ok(false);
        }
        let flags = if is_container {
            AceFlags::OBJECT_INHERIT | AceFlags::CONTAINER_INHERIT
        } else {
            AceFlags::empty()
        };
        let everyone = CommonAce::new(
            flags,
            AceQualifier::AccessAllowed,
            u32::MAX,
            Sid::from_well_known(WellKnownSidKind::World, None)?,
            false,
            Vec::new(),
        )?;
        let revision = if is_ds { ACL_REVISION_DS } else { ACL_REVISION };
        let acl = Acl::with_entries(revision, alloc::vec![Ace::Common(everyone)])?;
        self.dacl = DaclState::SyntheticEveryoneFullAccess(acl);
        self.normalize();
        Ok(true)
    }

    /// 资源管理器控制字节；`None` 表示 `RM_CONTROL_VALID` 未置位。
    #[must_use]
    pub fn resource_manager_control(&self) -> Option<u8> {
        self.rm_control
    }

    /// 替换资源管理器控制字节。
    pub fn set_resource_manager_control(&mut self, rm_control: Option<u8>) {
        self.rm_control = rm_control;
        self.normalize();
    }

    /// 二进制长度：头部加上每个实际写出的子结构。
    #[must_use]
    pub fn binary_len(&self) -> usize {
        DESCRIPTOR_HEADER_LEN
            + self.owner.as_ref().map_or(0, Sid::binary_len)
            + self.group.as_ref().map_or(0, Sid::binary_len)
            + self.sacl.as_ref().map_or(0, Acl::binary_len)
            + self.emitted_dacl().map_or(0, Acl::binary_len)
    }

    /// 将二进制形式追加到 `out`。
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let base = out.len();
        out.push(DESCRIPTOR_REVISION);
        out.push(self.rm_control.unwrap_or(0));
        wire::put_u16(out, self.control.bits());
        out.extend_from_slice(&[0u8; DESCRIPTOR_HEADER_LEN - 4]);

        if let Some(owner) = &self.owner {
            record_offset(out, base, OWNER_SLOT);
            owner.encode_into(out);
        }
        if let Some(group) = &self.group {
            record_offset(out, base, GROUP_SLOT);
            group.encode_into(out);
        }
        if let Some(sacl) = &self.sacl {
            record_offset(out, base, SACL_SLOT);
            sacl.encode_into(out);
        }
        if let Some(dacl) = self.emitted_dacl() {
            record_offset(out, base, DACL_SLOT);
            dacl.encode_into(out);
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

    fn emitted_dacl(&self) -> Option<&Acl> {
        match &self.dacl {
            DaclState::Present(acl) => Some(acl),
            DaclState::Absent | DaclState::SyntheticEveryoneFullAccess(_) => None,
        }
    }

    fn normalize(&mut self) {
        let control = &mut self.control;
        control.insert(ControlFlags::SELF_RELATIVE);
        control.set(ControlFlags::RM_CONTROL_VALID, self.rm_control.is_some());
        if self.sacl.is_some() {
            control.insert(ControlFlags::SACL_PRESENT);
        }
        match self.dacl {
            DaclState::Present(_) => control.insert(ControlFlags::DACL_PRESENT),
            DaclState::SyntheticEveryoneFullAccess(_) => control.remove(ControlFlags::DACL_PRESENT),
            DaclState::Absent => {}
        }
    }
}

fn present_list(
    bytes: &[u8],
    control: ControlFlags,
    presence: ControlFlags,
    at: Option<usize>,
) -> Result<Option<Acl>> {
    match (control.contains(presence), at) {
        (true, Some(at)) => Acl::from_bytes(bytes, at).map(Some),
        (false, Some(at)) => {
            trace!(?presence, at, "存在位未置位，忽略非零的列表偏移");
            Ok(None)
        }
        (_, None) => Ok(None),
    }
}

fn record_offset(out: &mut [u8], base: usize, slot: usize) {
    let relative = (out.len() - base) as u32;
    wire::patch_u32(out, base + slot, relative);
}

/// 读取头部中 `at` 处的偏移槽；0 表示该子结构缺失，非零值换算为 `bytes` 中的绝对位置。
fn read_slot(header: &[u8], offset: usize, at: usize) -> Result<Option<usize>> {
    let raw = wire::read_u32(header, at)
        .ok_or(SddlError::descriptor("描述符头部缺少偏移槽", offset + at))? as usize;
    if raw == 0 {
        return Ok(None);
    }
    offset
        .checked_add(raw)
        .map(Some)
        .ok_or(SddlError::descriptor("子结构偏移溢出", offset + at))
}
