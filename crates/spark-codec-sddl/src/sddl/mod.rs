//! SDDL 文本形式。
//!
//! ## 交互契约（What）
//! - 描述符文本由 `O:`、`G:`、`D:`、`S:` 四个可选节组成，解析时接受任意顺序，渲染固定为 O → G → D → S。
//! - `D:`/`S:` 节先写控制标志（`P`、`AR`、`AI`），再写括号包裹的条目；
//!   `NO_ACCESS_CONTROL` 表示列表缺失但存在位置位，不能与条目同时出现。
//! - 节内容为空（例如 `O:`、`D:`）一律视为格式错误。
//!
//! ## 风险提示（Trade-offs）
//! - 空的现存列表渲染为 `D:`，它无法被重新解析；解析得到的描述符不会出现这种状态。

pub mod tables;
pub(crate) mod tokenizer;

use alloc::string::{String, ToString};

use bitflags::bitflags;
use tracing::trace;

use self::tables::{DACL_SECTION_TOKENS, NO_ACCESS_CONTROL, SACL_SECTION_TOKENS, SectionToken};
use crate::acl::Acl;
use crate::descriptor::{ControlFlags, DaclState, SecurityDescriptor};
use crate::error::{Result, SddlError};
use crate::sid::Sid;

bitflags! {
    /// 渲染时选择输出哪些节。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Sections: u8 {
        /// `S:` 系统访问列表。
        const SACL = 0x01;
        /// `D:` 自主访问列表。
        const DACL = 0x02;
        /// `O:` 所有者。
        const OWNER = 0x04;
        /// `G:` 主组。
        const GROUP = 0x08;
        /// 全部四节。
        const ALL = Self::SACL.bits() | Self::DACL.bits() | Self::OWNER.bits() | Self::GROUP.bits();
    }
}

/// 一个访问列表节的解析结果；`list` 为 `None` 表示 `NO_ACCESS_CONTROL`。
struct ListSection {
    control: ControlFlags,
    list: Option<Acl>,
}

pub(crate) fn parse_descriptor(text: &str) -> Result<SecurityDescriptor> {
    let sections = tokenizer::split_sections(text)?;
    let owner = sections.owner.map(parse_principal).transpose()?;
    let group = sections.group.map(parse_principal).transpose()?;

    let mut control = ControlFlags::SELF_RELATIVE;
    let mut dacl = DaclState::Absent;
    if let Some(section) = sections.dacl {
        let parsed = parse_list_section(section, DACL_SECTION_TOKENS)?;
        control |= parsed.control | ControlFlags::DACL_PRESENT;
        if let Some(acl) = parsed.list {
            dacl = DaclState::Present(acl);
        }
    }
    let mut sacl = None;
    if let Some(section) = sections.sacl {
        let parsed = parse_list_section(section, SACL_SECTION_TOKENS)?;
        control |= parsed.control | ControlFlags::SACL_PRESENT;
        sacl = parsed.list;
    }

    Ok(SecurityDescriptor::from_parts(
        control, owner, group, sacl, dacl, None,
    ))
}

fn parse_principal(text: &str) -> Result<Sid> {
    if text.is_empty() {
        return Err(SddlError::descriptor("所有者或主组节为空", 0));
    }
    Sid::parse(text)
}

fn parse_list_section(text: &str, table: &[(&'static str, SectionToken)]) -> Result<ListSection> {
    let split = text.find('(').unwrap_or(text.len());
    let (prefix, body) = text.split_at(split);
    let tokens = tokenizer::scan_tokens(prefix, table)
        .ok_or(SddlError::descriptor("无法识别的访问列表节标志", 0))?;

    let mut control = ControlFlags::empty();
    let mut no_access_control = false;
    for token in tokens {
        match token {
            SectionToken::Control(flag) => control |= flag,
            SectionToken::NoAccessControl => no_access_control = true,
        }
    }

    let list = match (no_access_control, body.is_empty()) {
        (true, true) => None,
        (true, false) => {
            return Err(SddlError::descriptor(
                "NO_ACCESS_CONTROL 不能与条目同时出现",
                split,
            ));
        }
        (false, true) => {
            return Err(SddlError::descriptor("访问列表节既无条目也无 NO_ACCESS_CONTROL", split));
        }
        (false, false) => Some(Acl::from_sddl(body)?),
    };
    Ok(ListSection { control, list })
}

pub(crate) fn render_descriptor(descriptor: &SecurityDescriptor, sections: Sections) -> Result<String> {
    let control = descriptor.control_flags();
    let mut out = String::new();

    if sections.contains(Sections::OWNER) {
        if let Some(owner) = descriptor.owner() {
            out.push_str("O:");
            out.push_str(&owner.to_string());
        }
    }
    if sections.contains(Sections::GROUP) {
        if let Some(group) = descriptor.group() {
            out.push_str("G:");
            out.push_str(&group.to_string());
        }
    }
    if sections.contains(Sections::DACL) {
        let (list, synthetic) = match descriptor.dacl_state() {
            DaclState::Absent => (None, false),
            DaclState::Present(acl) => (Some(acl), false),
            DaclState::SyntheticEveryoneFullAccess(_) => (None, true),
        };
        let present = synthetic || control.contains(ControlFlags::DACL_PRESENT);
        render_list_section(&mut out, 'D', control, DACL_SECTION_TOKENS, list, present)?;
    }
    if sections.contains(Sections::SACL) {
        let present = control.contains(ControlFlags::SACL_PRESENT);
        render_list_section(&mut out, 'S', control, SACL_SECTION_TOKENS, descriptor.sacl(), present)?;
    }
    Ok(out)
}

fn render_list_section(
    out: &mut String,
    letter: char,
    control: ControlFlags,
    table: &[(&'static str, SectionToken)],
    list: Option<&Acl>,
    present: bool,
) -> Result<()> {
    let mut flags = String::new();
    for (token, value) in table {
        if let SectionToken::Control(flag) = value {
            if control.contains(*flag) {
                flags.push_str(token);
            }
        }
    }

    match list {
        Some(acl) => {
            out.push(letter);
            out.push(':');
            out.push_str(&flags);
            out.push_str(&acl.to_sddl()?);
        }
        None if present || !flags.is_empty() => {
            out.push(letter);
            out.push(':');
            out.push_str(&flags);
            out.push_str(NO_ACCESS_CONTROL);
        }
        None => trace!(section = %letter, "列表缺失，省略该节"),
    }
    Ok(())
}
