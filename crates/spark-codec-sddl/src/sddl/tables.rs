//! SDDL 缩写表。
//!
//! ## 教案目的（Why）
//! - SDDL 的互操作性完全取决于缩写记号与 Windows 原生实现一致；这些表因此属于公开契约。
//!
//! ## 交互契约（What）
//! - 每张表都是 `(记号, 取值)` 的静态切片，切片顺序即渲染顺序（例如条目标志按 `CI OI NP IO ID SA FA` 输出）。
//! - 查找走一次性构建的 `BTreeMap`（`spin::Lazy`），在 `no_std` 下同样可用。
//!
//! ## 风险提示（Trade-offs）
//! - 权限记号表取各版本的并集；只包含文件/注册表子集的历史表视为已知缺口。

use alloc::collections::BTreeMap;

use spin::Lazy;

use crate::ace::{AceFlags, AceType};
use crate::descriptor::ControlFlags;

/// 条目类型记号；没有记号的类型不可渲染。
pub const ACE_TYPE_TOKENS: &[(&str, AceType)] = &[
    ("A", AceType::AccessAllowed),
    ("D", AceType::AccessDenied),
    ("OA", AceType::AccessAllowedObject),
    ("OD", AceType::AccessDeniedObject),
    ("AU", AceType::SystemAudit),
    ("AL", AceType::SystemAlarm),
    ("OU", AceType::SystemAuditObject),
    ("OL", AceType::SystemAlarmObject),
    ("XA", AceType::AccessAllowedCallback),
    ("XD", AceType::AccessDeniedCallback),
    ("ZA", AceType::AccessAllowedCallbackObject),
    ("XU", AceType::SystemAuditCallback),
];

/// 条目标志记号，顺序即渲染顺序。
pub const ACE_FLAG_TOKENS: &[(&str, AceFlags)] = &[
    ("CI", AceFlags::CONTAINER_INHERIT),
    ("OI", AceFlags::OBJECT_INHERIT),
    ("NP", AceFlags::NO_PROPAGATE_INHERIT),
    ("IO", AceFlags::INHERIT_ONLY),
    ("ID", AceFlags::INHERITED),
    ("SA", AceFlags::SUCCESSFUL_ACCESS),
    ("FA", AceFlags::FAILED_ACCESS),
];

/// 访问权限记号（并集表）。
pub const RIGHTS_TOKENS: &[(&str, u32)] = &[
    // 通用权限
    ("GA", 0x1000_0000),
    ("GR", 0x8000_0000),
    ("GW", 0x4000_0000),
    ("GX", 0x2000_0000),
    // 标准权限
    ("RC", 0x0002_0000),
    ("SD", 0x0001_0000),
    ("WD", 0x0004_0000),
    ("WO", 0x0008_0000),
    // 目录服务
    ("RP", 0x0000_0010),
    ("WP", 0x0000_0020),
    ("CC", 0x0000_0001),
    ("DC", 0x0000_0002),
    ("LC", 0x0000_0004),
    ("SW", 0x0000_0008),
    ("LO", 0x0000_0080),
    ("DT", 0x0000_0040),
    ("CR", 0x0000_0100),
    // 文件
    ("FA", 0x001F_01FF),
    ("FR", 0x0012_0089),
    ("FW", 0x0012_0116),
    ("FX", 0x0012_00A0),
    // 注册表
    ("KA", 0x000F_003F),
    ("KR", 0x0002_0019),
    ("KW", 0x0002_0006),
    ("KX", 0x0002_0019),
    // 强制完整性标签
    ("NW", 0x0000_0001),
    ("NR", 0x0000_0002),
    ("NX", 0x0000_0004),
];

/// 访问列表节前缀中的记号。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SectionToken {
    /// 控制标志位。
    Control(ControlFlags),
    /// 列表缺失（空访问控制）。
    NoAccessControl,
}

/// 空访问控制记号。
pub const NO_ACCESS_CONTROL: &str = "NO_ACCESS_CONTROL";

/// `D:` 节的控制标志记号，顺序即渲染顺序。
pub(crate) const DACL_SECTION_TOKENS: &[(&str, SectionToken)] = &[
    ("P", SectionToken::Control(ControlFlags::DACL_PROTECTED)),
    ("AR", SectionToken::Control(ControlFlags::DACL_AUTO_INHERIT_REQ)),
    ("AI", SectionToken::Control(ControlFlags::DACL_AUTO_INHERITED)),
    (NO_ACCESS_CONTROL, SectionToken::NoAccessControl),
];

/// `S:` 节的控制标志记号，顺序即渲染顺序。
pub(crate) const SACL_SECTION_TOKENS: &[(&str, SectionToken)] = &[
    ("P", SectionToken::Control(ControlFlags::SACL_PROTECTED)),
    ("AR", SectionToken::Control(ControlFlags::SACL_AUTO_INHERIT_REQ)),
    ("AI", SectionToken::Control(ControlFlags::SACL_AUTO_INHERITED)),
    (NO_ACCESS_CONTROL, SectionToken::NoAccessControl),
];

/// 知名标识符缩写：记号、颁发机构、子颁发机构。
pub const SID_ABBREVIATIONS: &[(&str, u64, &[u32])] = &[
    ("AA", 5, &[32, 579]),
    ("AC", 15, &[2, 1]),
    ("AN", 5, &[7]),
    ("AO", 5, &[32, 548]),
    ("AS", 18, &[1]),
    ("AU", 5, &[11]),
    ("BA", 5, &[32, 544]),
    ("BG", 5, &[32, 546]),
    ("BO", 5, &[32, 551]),
    ("BU", 5, &[32, 545]),
    ("CD", 5, &[32, 574]),
    ("CG", 3, &[1]),
    ("CO", 3, &[0]),
    ("CY", 5, &[32, 569]),
    ("ED", 5, &[9]),
    ("ER", 5, &[32, 573]),
    ("HA", 5, &[32, 578]),
    ("HI", 16, &[0x3000]),
    ("IS", 5, &[32, 568]),
    ("IU", 5, &[4]),
    ("LS", 5, &[19]),
    ("LU", 5, &[32, 559]),
    ("LW", 16, &[0x1000]),
    ("ME", 16, &[0x2000]),
    ("MU", 5, &[32, 558]),
    ("NO", 5, &[32, 556]),
    ("NS", 5, &[20]),
    ("NU", 5, &[2]),
    ("OW", 3, &[4]),
    ("PO", 5, &[32, 550]),
    ("PS", 5, &[10]),
    ("PU", 5, &[32, 547]),
    ("RA", 5, &[32, 575]),
    ("RC", 5, &[12]),
    ("RD", 5, &[32, 555]),
    ("RE", 5, &[32, 552]),
    ("RM", 5, &[32, 580]),
    ("RU", 5, &[32, 554]),
    ("SI", 16, &[0x4000]),
    ("SO", 5, &[32, 549]),
    ("SS", 18, &[2]),
    ("SU", 5, &[6]),
    ("SY", 5, &[18]),
    ("WD", 1, &[0]),
    ("WR", 5, &[33]),
];

/// 需要域上下文才能展开的缩写。
pub const DOMAIN_ABBREVIATIONS: &[&str] = &[
    "AP", "CA", "CN", "DA", "DC", "DD", "DG", "DU", "EA", "EK", "KA", "LA", "LG", "PA", "RO", "RS",
    "SA",
];

static ACE_TYPE_BY_TOKEN: Lazy<BTreeMap<&'static str, AceType>> =
    Lazy::new(|| ACE_TYPE_TOKENS.iter().copied().collect());

static TOKEN_BY_ACE_TYPE: Lazy<BTreeMap<AceType, &'static str>> = Lazy::new(|| {
    ACE_TYPE_TOKENS
        .iter()
        .map(|(token, ace_type)| (*ace_type, *token))
        .collect()
});

static SID_BY_TOKEN: Lazy<BTreeMap<&'static str, (u64, &'static [u32])>> = Lazy::new(|| {
    SID_ABBREVIATIONS
        .iter()
        .map(|(token, authority, subs)| (*token, (*authority, *subs)))
        .collect()
});

/// 条目类型记号 → 类型。
#[must_use]
pub fn ace_type_from_token(token: &str) -> Option<AceType> {
    ACE_TYPE_BY_TOKEN.get(token).copied()
}

/// 类型 → 条目类型记号。
#[must_use]
pub fn ace_type_token(ace_type: AceType) -> Option<&'static str> {
    TOKEN_BY_ACE_TYPE.get(&ace_type).copied()
}

/// 标识符缩写 → `(颁发机构, 子颁发机构)`。
#[must_use]
pub fn sid_abbreviation(token: &str) -> Option<(u64, &'static [u32])> {
    SID_BY_TOKEN.get(token).copied()
}

/// 是否为域相对缩写。
#[must_use]
pub fn is_domain_abbreviation(token: &str) -> bool {
    DOMAIN_ABBREVIATIONS.contains(&token)
}
