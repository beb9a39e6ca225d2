#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # spark-codec-sddl
//!
//! ## 教案目的（Why）
//! - **定位**：Windows 安全描述符的编解码器，覆盖安全标识符（SID）、访问控制条目（ACE）、
//!   访问控制列表（ACL）与自相对安全描述符，以及它们的 SDDL 文本形式。
//! - **架构角色**：为需要读写 NTFS/注册表/目录服务权限的上层组件提供强类型模型；
//!   本 crate 不做访问检查，也不与操作系统交互。
//!
//! ## 交互契约（What）
//! - 每个层次都提供 `from_bytes`/`encode_into`/`to_bytes`/`write_to`/`binary_len`，
//!   SDDL 层提供 `from_sddl`/`to_sddl`（SID 使用 `parse` 与 `Display`）。
//! - 二进制整数一律小端，唯一例外是 SID 的 48 位颁发机构（大端）。
//! - 二进制往返保证语义相等：`decode(encode(x)) == x`；SDDL 往返保证对解析结果幂等，不保证逐字节还原原文。
//! - 所有失败通过 [`SddlError`] 报告，调用方可用 [`SddlError::kind`] 区分类别。
//!
//! ## 实现策略（How）
//! - 解码全部基于有界切片：每一层先校验声明长度不超过可用字节，再把后续解析限制在该范围内。
//! - 记号表集中在 [`sddl::tables`]，以 `spin::Lazy` 构建查找映射，`no_std + alloc` 下同样可用。
//! - 关键的兼容分支（例如 ADSI 对象条目尾部多出 32 字节）通过 `tracing` 留下诊断事件。
//!
//! ## 风险提示（Trade-offs）
//! - 仅支持自相对描述符；绝对格式返回 `UnsupportedForm`。
//! - 复合条目与自定义类型条目只有二进制形式，渲染 SDDL 时返回 `NotSupported`。
//! - 带附加数据的回调条目在 SDDL 中丢失附加数据（不解析条件表达式）。

extern crate alloc;

pub mod ace;
pub mod acl;
pub mod descriptor;
pub mod error;
pub mod guid;
pub mod sddl;
pub mod sid;

mod wire;

pub use ace::{
    Ace, AceFlags, AceQualifier, AceType, AuditFlags, CommonAce, CompoundAce, CompoundAceType,
    CustomAce, InheritanceFlags, ObjectAce, ObjectAceFlags, PropagationFlags,
};
pub use acl::{ACL_REVISION, ACL_REVISION_DS, Acl};
pub use descriptor::{ControlFlags, DaclState, SecurityDescriptor};
pub use error::{ErrorKind, Result, SddlError};
pub use guid::Guid;
pub use sddl::Sections;
pub use sid::{Sid, SidParts, WellKnownSidKind};
