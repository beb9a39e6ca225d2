//! 安全描述符编解码错误类型定义。
//!
//! # 教案定位（Why）
//! - 二进制与 SDDL 两条路径共享同一组失败分类，调用方只需匹配 [`ErrorKind`] 即可决定是丢弃输入、修正参数还是降级处理。
//! - 与各编解码模块解耦，避免解析逻辑与错误枚举相互污染。
//!
//! # 使用契约（What）
//! - 每个变体携带一个静态原因标签与数值上下文（偏移、取值或上限），满足 `no_std + alloc` 环境。
//! - 所有变体均实现 `Clone`/`PartialEq`，测试可以直接断言具体错误。
//!
//! # 设计考量（How）
//! - 借助 `thiserror` 派生 `Display` 与 `Error`；关闭默认特性后依赖 `core::error::Error`，在 `no_std` 下同样可用。

use alloc::string::String;

use thiserror::Error;

/// 编解码统一返回类型。
pub type Result<T, E = SddlError> = core::result::Result<T, E>;

/// 编解码过程中可能出现的错误。
///
/// ## 教案解读（Why）
/// - `Malformed*` 四个分支对应四层结构（标识符、访问条目、访问列表、描述符），便于定位损坏发生在哪一层。
/// - `OutOfRange` 专用于构造或修改时违反尺寸/取值上限的情形，区别于“输入损坏”。
///
/// ## 契约定义（What）
/// - 触发错误后输出结构不可用；解码函数不会返回部分结果。
/// - `offset` 字段在二进制路径上表示相对输入切片起点的字节偏移，在文本路径上表示字符位置。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SddlError {
    /// 安全标识符（SID）的二进制或文本形式无效。
    #[error("安全标识符无效（偏移 {offset}）：{reason}")]
    MalformedIdentifier {
        /// 静态原因标签。
        reason: &'static str,
        /// 出错位置。
        offset: usize,
    },
    /// 访问控制条目（ACE）无效。
    #[error("访问控制条目无效（偏移 {offset}）：{reason}")]
    MalformedEntry {
        /// 静态原因标签。
        reason: &'static str,
        /// 出错位置。
        offset: usize,
    },
    /// 访问控制列表（ACL）无效。
    #[error("访问控制列表无效（偏移 {offset}）：{reason}")]
    MalformedList {
        /// 静态原因标签。
        reason: &'static str,
        /// 出错位置。
        offset: usize,
    },
    /// 安全描述符整体结构无效。
    #[error("安全描述符无效（偏移 {offset}）：{reason}")]
    MalformedDescriptor {
        /// 静态原因标签。
        reason: &'static str,
        /// 出错位置。
        offset: usize,
    },
    /// 取值超过协议允许的上限。
    #[error("{reason}：取值 {value} 超过上限 {limit}")]
    OutOfRange {
        /// 静态原因标签。
        reason: &'static str,
        /// 实际取值。
        value: u64,
        /// 允许的最大值。
        limit: u64,
    },
    /// 输入使用了可识别但当前实现不接受的形式（如域相对缩写）。
    #[error("不支持的输入形式 `{token}`：{reason}")]
    UnsupportedForm {
        /// 静态原因标签。
        reason: &'static str,
        /// 触发问题的原始片段。
        token: String,
    },
    /// 某个变体不具备对应的文本表示或查询能力。
    #[error("操作不受支持（代码 {code:#04x}）：{reason}")]
    NotSupported {
        /// 静态原因标签。
        reason: &'static str,
        /// 相关的类型代码或种类编号。
        code: u32,
    },
    /// 调用方提供的输出缓冲不足。
    #[error("输出缓冲不足：需要 {required} 字节，仅有 {available} 字节")]
    BufferTooSmall {
        /// 写入所需的字节数。
        required: usize,
        /// 缓冲中从写入偏移开始的可用字节数。
        available: usize,
    },
}

/// [`SddlError`] 的无数据分类，便于调用方做粗粒度匹配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 见 [`SddlError::MalformedIdentifier`]。
    MalformedIdentifier,
    /// 见 [`SddlError::MalformedEntry`]。
    MalformedEntry,
    /// 见 [`SddlError::MalformedList`]。
    MalformedList,
    /// 见 [`SddlError::MalformedDescriptor`]。
    MalformedDescriptor,
    /// 见 [`SddlError::OutOfRange`]。
    OutOfRange,
    /// 见 [`SddlError::UnsupportedForm`]。
    UnsupportedForm,
    /// 见 [`SddlError::NotSupported`]。
    NotSupported,
    /// 见 [`SddlError::BufferTooSmall`]。
    BufferTooSmall,
}

impl SddlError {
    /// 返回错误的分类。
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedIdentifier { .. } => ErrorKind::MalformedIdentifier,
            Self::MalformedEntry { .. } => ErrorKind::MalformedEntry,
            Self::MalformedList { .. } => ErrorKind::MalformedList,
            Self::MalformedDescriptor { .. } => ErrorKind::MalformedDescriptor,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::UnsupportedForm { .. } => ErrorKind::UnsupportedForm,
            Self::NotSupported { .. } => ErrorKind::NotSupported,
            Self::BufferTooSmall { .. } => ErrorKind::BufferTooSmall,
        }
    }

    /// 是否属于“输入损坏”类错误（四个 `Malformed*` 分支）。
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MalformedIdentifier
                | ErrorKind::MalformedEntry
                | ErrorKind::MalformedList
                | ErrorKind::MalformedDescriptor
        )
    }

    pub(crate) const fn identifier(reason: &'static str, offset: usize) -> Self {
        Self::MalformedIdentifier { reason, offset }
    }

    pub(crate) const fn entry(reason: &'static str, offset: usize) -> Self {
        Self::MalformedEntry { reason, offset }
    }

    pub(crate) const fn list(reason: &'static str, offset: usize) -> Self {
        Self::MalformedList { reason, offset }
    }

    pub(crate) const fn descriptor(reason: &'static str, offset: usize) -> Self {
        Self::MalformedDescriptor { reason, offset }
    }

    pub(crate) fn unsupported(reason: &'static str, token: &str) -> Self {
        Self::UnsupportedForm {
            reason,
            token: String::from(token),
        }
    }
}
