//! 知名安全标识符种类表。
//!
//! ## 教案目的（Why）
//! - Windows 为大量系统主体预留了固定的标识符（如 `S-1-5-18` 代表本地系统）；调用方经常需要按名称构造它们。
//! - 另一部分种类是“域相对”的：只有给定域标识符后才能拼接出完整 SID（如域管理员 = 域 SID + RID 512）。
//!
//! ## 交互契约（What）
//! - [`WellKnownSidKind`] 的数值编号固定为 0..=94，可通过 [`WellKnownSidKind::from_u8`] 与 [`WellKnownSidKind::as_u8`] 互转。
//! - [`WellKnownSidKind::parts`] 给出组成方式；`LogonIds` 没有固定形态，返回 [`SidParts::Unavailable`]。
//!
//! ## 实现策略（How）
//! - 用一张宏展开的表同时生成枚举、编号转换和组成方式，避免三处列表不同步。

use super::{NT_AUTHORITY, Sid};
use crate::error::{Result, SddlError};

/// 知名种类的组成方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidParts {
    /// 固定的颁发机构与子颁发机构序列。
    Fixed {
        /// 48 位颁发机构。
        authority: u64,
        /// 子颁发机构序列。
        sub_authorities: &'static [u32],
    },
    /// 域标识符后追加的相对标识符（RID）。
    DomainRelative {
        /// 追加的 RID。
        rid: u32,
    },
    /// 不存在确定形态（登录会话标识符）。
    Unavailable,
}

macro_rules! well_known_kinds {
    ($($(#[$doc:meta])* $name:ident = $code:literal => $parts:expr,)+) => {
        /// 知名安全标识符种类，编号与 Windows `WELL_KNOWN_SID_TYPE` 一致。
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum WellKnownSidKind {
            $($(#[$doc])* $name = $code,)+
        }

        impl WellKnownSidKind {
            /// 全部种类，按编号升序排列。
            pub const ALL: &'static [WellKnownSidKind] = &[$(WellKnownSidKind::$name,)+];

            /// 从数值编号还原种类；超出 0..=94 时返回 `None`。
            #[must_use]
            pub const fn from_u8(code: u8) -> Option<Self> {
                match code {
                    $($code => Some(Self::$name),)+
                    _ => None,
                }
            }

            /// 返回种类的组成方式。
            #[must_use]
            pub const fn parts(self) -> SidParts {
                match self {
                    $(Self::$name => $parts,)+
                }
            }
        }
    };
}

const fn fixed(authority: u64, sub_authorities: &'static [u32]) -> SidParts {
    SidParts::Fixed {
        authority,
        sub_authorities,
    }
}

const fn nt(sub_authorities: &'static [u32]) -> SidParts {
    fixed(NT_AUTHORITY, sub_authorities)
}

const fn domain(rid: u32) -> SidParts {
    SidParts::DomainRelative { rid }
}

const LABEL: u64 = 16;
const PACKAGE: u64 = 15;

well_known_kinds! {
    /// `S-1-0-0`
    Null = 0 => fixed(0, &[0]),
    /// `S-1-1-0`，所有人。
    World = 1 => fixed(1, &[0]),
    /// `S-1-2-0`
    Local = 2 => fixed(2, &[0]),
    /// `S-1-3-0`
    CreatorOwner = 3 => fixed(3, &[0]),
    /// `S-1-3-1`
    CreatorGroup = 4 => fixed(3, &[1]),
    /// `S-1-3-2`
    CreatorOwnerServer = 5 => fixed(3, &[2]),
    /// `S-1-3-3`
    CreatorGroupServer = 6 => fixed(3, &[3]),
    /// `S-1-5`
    NtAuthority = 7 => nt(&[]),
    /// `S-1-5-1`
    Dialup = 8 => nt(&[1]),
    /// `S-1-5-2`
    Network = 9 => nt(&[2]),
    /// `S-1-5-3`
    Batch = 10 => nt(&[3]),
    /// `S-1-5-4`
    Interactive = 11 => nt(&[4]),
    /// `S-1-5-6`
    Service = 12 => nt(&[6]),
    /// `S-1-5-7`
    Anonymous = 13 => nt(&[7]),
    /// `S-1-5-8`
    Proxy = 14 => nt(&[8]),
    /// `S-1-5-9`
    EnterpriseControllers = 15 => nt(&[9]),
    /// `S-1-5-10`
    SelfPrincipal = 16 => nt(&[10]),
    /// `S-1-5-11`
    AuthenticatedUser = 17 => nt(&[11]),
    /// `S-1-5-12`
    RestrictedCode = 18 => nt(&[12]),
    /// `S-1-5-13`
    TerminalServer = 19 => nt(&[13]),
    /// `S-1-5-14`
    RemoteLogonId = 20 => nt(&[14]),
    /// `S-1-5-5-X-Y`，随登录会话变化，无法构造。
    LogonIds = 21 => SidParts::Unavailable,
    /// `S-1-5-18`
    LocalSystem = 22 => nt(&[18]),
    /// `S-1-5-19`
    LocalService = 23 => nt(&[19]),
    /// `S-1-5-20`
    NetworkService = 24 => nt(&[20]),
    /// `S-1-5-32`
    BuiltinDomain = 25 => nt(&[32]),
    /// `S-1-5-32-544`
    BuiltinAdministrators = 26 => nt(&[32, 544]),
    /// `S-1-5-32-545`
    BuiltinUsers = 27 => nt(&[32, 545]),
    /// `S-1-5-32-546`
    BuiltinGuests = 28 => nt(&[32, 546]),
    /// `S-1-5-32-547`
    BuiltinPowerUsers = 29 => nt(&[32, 547]),
    /// `S-1-5-32-548`
    BuiltinAccountOperators = 30 => nt(&[32, 548]),
    /// `S-1-5-32-549`
    BuiltinSystemOperators = 31 => nt(&[32, 549]),
    /// `S-1-5-32-550`
    BuiltinPrintOperators = 32 => nt(&[32, 550]),
    /// `S-1-5-32-551`
    BuiltinBackupOperators = 33 => nt(&[32, 551]),
    /// `S-1-5-32-552`
    BuiltinReplicator = 34 => nt(&[32, 552]),
    /// `S-1-5-32-554`
    BuiltinPreWindows2000CompatibleAccess = 35 => nt(&[32, 554]),
    /// `S-1-5-32-555`
    BuiltinRemoteDesktopUsers = 36 => nt(&[32, 555]),
    /// `S-1-5-32-556`
    BuiltinNetworkConfigurationOperators = 37 => nt(&[32, 556]),
    /// 域 RID 500
    AccountAdministrator = 38 => domain(500),
    /// 域 RID 501
    AccountGuest = 39 => domain(501),
    /// 域 RID 502
    AccountKrbtgt = 40 => domain(502),
    /// 域 RID 512
    AccountDomainAdmins = 41 => domain(512),
    /// 域 RID 513
    AccountDomainUsers = 42 => domain(513),
    /// 域 RID 514
    AccountDomainGuests = 43 => domain(514),
    /// 域 RID 515
    AccountComputers = 44 => domain(515),
    /// 域 RID 516
    AccountControllers = 45 => domain(516),
    /// 域 RID 517
    AccountCertAdmins = 46 => domain(517),
    /// 域 RID 518
    AccountSchemaAdmins = 47 => domain(518),
    /// 域 RID 519
    AccountEnterpriseAdmins = 48 => domain(519),
    /// 域 RID 520
    AccountPolicyAdmins = 49 => domain(520),
    /// 域 RID 553
    AccountRasAndIasServers = 50 => domain(553),
    /// `S-1-5-64-10`
    NtlmAuthentication = 51 => nt(&[64, 10]),
    /// `S-1-5-64-21`
    DigestAuthentication = 52 => nt(&[64, 21]),
    /// `S-1-5-64-14`
    SChannelAuthentication = 53 => nt(&[64, 14]),
    /// `S-1-5-15`
    ThisOrganization = 54 => nt(&[15]),
    /// `S-1-5-1000`
    OtherOrganization = 55 => nt(&[1000]),
    /// `S-1-5-32-557`
    BuiltinIncomingForestTrustBuilders = 56 => nt(&[32, 557]),
    /// `S-1-5-32-558`
    BuiltinPerformanceMonitoringUsers = 57 => nt(&[32, 558]),
    /// `S-1-5-32-559`
    BuiltinPerformanceLoggingUsers = 58 => nt(&[32, 559]),
    /// `S-1-5-32-560`
    BuiltinAuthorizationAccess = 59 => nt(&[32, 560]),
    /// `S-1-5-32-561`
    BuiltinTerminalServerLicenseServers = 60 => nt(&[32, 561]),
    /// `S-1-5-32-562`
    BuiltinDcomUsers = 61 => nt(&[32, 562]),
    /// `S-1-5-32-568`
    BuiltinIUsers = 62 => nt(&[32, 568]),
    /// `S-1-5-17`
    IUser = 63 => nt(&[17]),
    /// `S-1-5-32-569`
    BuiltinCryptoOperators = 64 => nt(&[32, 569]),
    /// `S-1-16-0`
    UntrustedLabel = 65 => fixed(LABEL, &[0]),
    /// `S-1-16-4096`
    LowLabel = 66 => fixed(LABEL, &[0x1000]),
    /// `S-1-16-8192`
    MediumLabel = 67 => fixed(LABEL, &[0x2000]),
    /// `S-1-16-12288`
    HighLabel = 68 => fixed(LABEL, &[0x3000]),
    /// `S-1-16-16384`
    SystemLabel = 69 => fixed(LABEL, &[0x4000]),
    /// `S-1-5-33`
    WriteRestrictedCode = 70 => nt(&[33]),
    /// `S-1-3-4`
    CreatorOwnerRights = 71 => fixed(3, &[4]),
    /// 域 RID 571
    CacheablePrincipalsGroup = 72 => domain(571),
    /// 域 RID 572
    NonCacheablePrincipalsGroup = 73 => domain(572),
    /// 域 RID 498
    EnterpriseReadonlyControllers = 74 => domain(498),
    /// 域 RID 521
    AccountReadonlyControllers = 75 => domain(521),
    /// `S-1-5-32-573`
    BuiltinEventLogReaders = 76 => nt(&[32, 573]),
    /// `S-1-5-22`
    NewEnterpriseReadonlyControllers = 77 => nt(&[22]),
    /// `S-1-5-32-574`
    BuiltinCertSvcDcomAccess = 78 => nt(&[32, 574]),
    /// `S-1-16-8448`
    MediumPlusLabel = 79 => fixed(LABEL, &[0x2100]),
    /// `S-1-2-0`
    LocalLogon = 80 => fixed(2, &[0]),
    /// `S-1-2-1`
    ConsoleLogon = 81 => fixed(2, &[1]),
    /// `S-1-5-65-1`
    ThisOrganizationCertificate = 82 => nt(&[65, 1]),
    /// `S-1-15-2`
    ApplicationPackageAuthority = 83 => fixed(PACKAGE, &[2]),
    /// `S-1-15-2-1`，所有应用包。
    BuiltinAnyPackage = 84 => fixed(PACKAGE, &[2, 1]),
    /// `S-1-15-3-1`
    CapabilityInternetClient = 85 => fixed(PACKAGE, &[3, 1]),
    /// `S-1-15-3-2`
    CapabilityInternetClientServer = 86 => fixed(PACKAGE, &[3, 2]),
    /// `S-1-15-3-3`
    CapabilityPrivateNetworkClientServer = 87 => fixed(PACKAGE, &[3, 3]),
    /// `S-1-15-3-4`
    CapabilityPicturesLibrary = 88 => fixed(PACKAGE, &[3, 4]),
    /// `S-1-15-3-5`
    CapabilityVideosLibrary = 89 => fixed(PACKAGE, &[3, 5]),
    /// `S-1-15-3-6`
    CapabilityMusicLibrary = 90 => fixed(PACKAGE, &[3, 6]),
    /// `S-1-15-3-7`
    CapabilityDocumentsLibrary = 91 => fixed(PACKAGE, &[3, 7]),
    /// `S-1-15-3-9`
    CapabilitySharedUserCertificates = 92 => fixed(PACKAGE, &[3, 9]),
    /// `S-1-15-3-8`
    CapabilityEnterpriseAuthentication = 93 => fixed(PACKAGE, &[3, 8]),
    /// `S-1-15-3-10`
    CapabilityRemovableStorage = 94 => fixed(PACKAGE, &[3, 10]),
}

impl WellKnownSidKind {
    /// 返回种类的数值编号。
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// 是否需要域标识符才能构造。
    #[must_use]
    pub const fn is_domain_relative(self) -> bool {
        matches!(self.parts(), SidParts::DomainRelative { .. })
    }

    /// 按种类构造标识符。
    ///
    /// - 固定种类忽略 `domain`；
    /// - 域相对种类缺少 `domain` 时返回 `NotSupported`，`domain` 不是 `S-1-5-21-…` 形式时返回 `MalformedIdentifier`；
    /// - `LogonIds` 返回 `NotSupported`。
    pub fn to_sid(self, domain: Option<&Sid>) -> Result<Sid> {
        match self.parts() {
            SidParts::Fixed {
                authority,
                sub_authorities,
            } => Sid::new(authority, sub_authorities),
            SidParts::DomainRelative { rid } => {
                let domain = domain.ok_or(SddlError::NotSupported {
                    reason: "域相对种类缺少域标识符",
                    code: u32::from(self.as_u8()),
                })?;
                if !domain.is_account_domain() {
                    return Err(SddlError::identifier("域标识符必须形如 S-1-5-21-…", 0));
                }
                domain.with_rid(rid)
            }
            SidParts::Unavailable => Err(SddlError::NotSupported {
                reason: "登录会话标识符没有固定形态",
                code: u32::from(self.as_u8()),
            }),
        }
    }
}
