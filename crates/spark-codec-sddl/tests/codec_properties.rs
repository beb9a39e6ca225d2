//! 编解码性质验证。
//!
//! # 教案级注释概览
//!
//! - **核心目标 (Why)**：用随机生成的模型验证四条全局性质：二进制往返相等、SDDL 渲染对解析结果幂等、
//!   列表长度永不超过 65535、任意截断或随机输入只会返回错误而不会 panic。
//! - **设计手法 (How)**：策略只生成可表示的模型（例如 SDDL 性质只使用有记号的条目类型与标志位，对象条目的 GUID 可有可无），
//!   每个性质各自独立，失败时 proptest 会收缩出最小反例。
//! - **合同与边界 (What)**：合成 DACL 不参与二进制往返，因此生成器从不调用 `synthesize_null_dacl`。

use proptest::prelude::*;

use spark_codec_sddl::{
    ACL_REVISION, ACL_REVISION_DS, Ace, AceFlags, AceQualifier, Acl, CommonAce, ControlFlags,
    CustomAce, Guid, ObjectAce, Sections, SecurityDescriptor, Sid, sid::MAX_AUTHORITY,
};

fn sid_strategy() -> impl Strategy<Value = Sid> {
    (0..=MAX_AUTHORITY, prop::collection::vec(any::<u32>(), 0..=15))
        .prop_map(|(authority, subs)| Sid::new(authority, &subs).expect("范围内的 SID"))
}

fn guid_strategy() -> impl Strategy<Value = Option<Guid>> {
    prop::option::of(any::<[u8; 16]>().prop_map(|bytes| Guid::from_bytes_le(&bytes)))
        .prop_map(|guid| guid.filter(|g| !g.is_nil()))
}

fn qualifier_strategy() -> impl Strategy<Value = AceQualifier> {
    prop_oneof![
        Just(AceQualifier::AccessAllowed),
        Just(AceQualifier::AccessDenied),
        Just(AceQualifier::SystemAudit),
        Just(AceQualifier::SystemAlarm),
    ]
}

fn opaque_strategy() -> impl Strategy<Value = Vec<u8>> {
    (0usize..4).prop_flat_map(|words| prop::collection::vec(any::<u8>(), words * 4))
}

/// 任意可编码条目，覆盖四种变体。
fn binary_ace_strategy() -> impl Strategy<Value = Ace> {
    let flags = any::<u8>().prop_map(AceFlags::from_bits_retain);
    prop_oneof![
        (flags.clone(), qualifier_strategy(), any::<u32>(), sid_strategy(), any::<bool>(), opaque_strategy())
            .prop_map(|(flags, qualifier, mask, sid, callback, opaque)| {
                let opaque = if callback { opaque } else { Vec::new() };
                Ace::Common(CommonAce::new(flags, qualifier, mask, sid, callback, opaque).expect("合法普通条目"))
            }),
        (flags.clone(), qualifier_strategy(), any::<u32>(), sid_strategy(), guid_strategy(), guid_strategy(), any::<bool>(), opaque_strategy())
            .prop_map(|(flags, qualifier, mask, sid, object, inherited, callback, opaque)| {
                let opaque = if callback { opaque } else { Vec::new() };
                Ace::Object(
                    ObjectAce::new(flags, qualifier, mask, sid, object, inherited, callback, opaque)
                        .expect("合法对象条目"),
                )
            }),
        (0x11u8..=0xFF, flags, opaque_strategy())
            .prop_map(|(code, flags, opaque)| Ace::Custom(CustomAce::new(code, flags, opaque).expect("合法自定义条目"))),
    ]
}

fn binary_acl_strategy() -> impl Strategy<Value = Acl> {
    (prop_oneof![Just(ACL_REVISION), Just(ACL_REVISION_DS)], prop::collection::vec(binary_ace_strategy(), 0..6))
        .prop_map(|(revision, entries)| Acl::with_entries(revision, entries).expect("远低于上限"))
}

fn binary_descriptor_strategy() -> impl Strategy<Value = SecurityDescriptor> {
    (
        any::<u16>().prop_map(ControlFlags::from_bits_retain),
        prop::option::of(sid_strategy()),
        prop::option::of(sid_strategy()),
        prop::option::of(binary_acl_strategy()),
        prop::option::of(binary_acl_strategy()),
        prop::option::of(any::<u8>()),
    )
        .prop_map(|(flags, owner, group, sacl, dacl, rm)| {
            let mut descriptor = SecurityDescriptor::new(flags, owner, group, sacl, dacl);
            descriptor.set_resource_manager_control(rm);
            descriptor
        })
}

/// 有 SDDL 记号的条目标志位。
fn textual_flags_strategy() -> impl Strategy<Value = AceFlags> {
    let textual_flags = (AceFlags::INHERITANCE | AceFlags::PROPAGATION | AceFlags::INHERITED | AceFlags::AUDIT).bits();
    any::<u8>().prop_map(move |bits| AceFlags::from_bits_retain(bits & textual_flags))
}

/// 有 SDDL 记号的普通条目与对象条目；回调条目不带附加数据。
fn textual_ace_strategy() -> impl Strategy<Value = Ace> {
    let common_kind = prop_oneof![
        Just((AceQualifier::AccessAllowed, false)),
        Just((AceQualifier::AccessDenied, false)),
        Just((AceQualifier::SystemAudit, false)),
        Just((AceQualifier::SystemAlarm, false)),
        Just((AceQualifier::AccessAllowed, true)),
        Just((AceQualifier::AccessDenied, true)),
        Just((AceQualifier::SystemAudit, true)),
    ];
    // OA / OD / OU / OL / ZA
    let object_kind = prop_oneof![
        Just((AceQualifier::AccessAllowed, false)),
        Just((AceQualifier::AccessDenied, false)),
        Just((AceQualifier::SystemAudit, false)),
        Just((AceQualifier::SystemAlarm, false)),
        Just((AceQualifier::AccessAllowed, true)),
    ];
    prop_oneof![
        (textual_flags_strategy(), common_kind, any::<u32>(), sid_strategy()).prop_map(
            |(flags, (qualifier, callback), mask, sid)| {
                Ace::Common(CommonAce::new(flags, qualifier, mask, sid, callback, Vec::new()).expect("合法普通条目"))
            },
        ),
        (textual_flags_strategy(), object_kind, any::<u32>(), sid_strategy(), guid_strategy(), guid_strategy()).prop_map(
            |(flags, (qualifier, callback), mask, sid, object, inherited)| {
                Ace::Object(
                    ObjectAce::new(flags, qualifier, mask, sid, object, inherited, callback, Vec::new())
                        .expect("合法对象条目"),
                )
            },
        ),
    ]
}

fn textual_acl_strategy() -> impl Strategy<Value = Acl> {
    prop::collection::vec(textual_ace_strategy(), 1..6).prop_map(|entries| {
        let revision = if entries.iter().any(|ace| matches!(ace, Ace::Object(_))) {
            ACL_REVISION_DS
        } else {
            ACL_REVISION
        };
        Acl::with_entries(revision, entries).expect("远低于上限")
    })
}

fn textual_descriptor_strategy() -> impl Strategy<Value = SecurityDescriptor> {
    let section_flags = ControlFlags::DACL_PROTECTED
        | ControlFlags::DACL_AUTO_INHERIT_REQ
        | ControlFlags::DACL_AUTO_INHERITED
        | ControlFlags::SACL_PROTECTED
        | ControlFlags::SACL_AUTO_INHERIT_REQ
        | ControlFlags::SACL_AUTO_INHERITED;
    (
        any::<u16>().prop_map(move |bits| ControlFlags::from_bits_retain(bits) & section_flags),
        prop::option::of(sid_strategy()),
        prop::option::of(sid_strategy()),
        prop::option::of(textual_acl_strategy()),
        prop::option::of(textual_acl_strategy()),
    )
        .prop_map(|(flags, owner, group, sacl, dacl)| SecurityDescriptor::new(flags, owner, group, sacl, dacl))
}

proptest! {
    #[test]
    fn prop_sid_binary_and_text_round_trip(sid in sid_strategy()) {
        prop_assert_eq!(Sid::from_bytes(&sid.to_bytes(), 0), Ok(sid.clone()));
        prop_assert_eq!(sid.to_string().parse::<Sid>(), Ok(sid));
    }

    #[test]
    fn prop_ace_binary_round_trip(ace in binary_ace_strategy()) {
        let bytes = ace.to_bytes();
        prop_assert_eq!(bytes.len(), ace.binary_len());
        prop_assert_eq!(bytes.len() % 4, 0);
        prop_assert_eq!(Ace::from_bytes(&bytes, 0), Ok(ace));
    }

    #[test]
    fn prop_acl_binary_round_trip(acl in binary_acl_strategy()) {
        prop_assert_eq!(Acl::from_bytes(&acl.to_bytes(), 0), Ok(acl));
    }

    #[test]
    fn prop_descriptor_binary_round_trip(descriptor in binary_descriptor_strategy()) {
        let bytes = descriptor.to_bytes();
        prop_assert_eq!(bytes.len(), descriptor.binary_len());
        prop_assert_eq!(SecurityDescriptor::from_bytes(&bytes, 0), Ok(descriptor));
    }

    #[test]
    fn prop_sddl_rendering_is_idempotent(descriptor in textual_descriptor_strategy()) {
        let first = descriptor.to_sddl(Sections::ALL).expect("可渲染");
        let reparsed = SecurityDescriptor::from_sddl(&first).expect("渲染结果可解析");
        let second = reparsed.to_sddl(Sections::ALL).expect("可渲染");
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(SecurityDescriptor::from_sddl(&second).expect("可解析"), reparsed.clone());
        prop_assert_eq!(SecurityDescriptor::from_bytes(&reparsed.to_bytes(), 0), Ok(reparsed));
    }

    #[test]
    fn prop_list_never_exceeds_ceiling(payload_words in 1000usize..16_000, pushes in 1usize..12) {
        let mut acl = Acl::new(ACL_REVISION);
        for _ in 0..pushes {
            let entry = CustomAce::new(0x20, AceFlags::empty(), vec![0; payload_words * 4]).expect("合法自定义条目");
            if acl.push(Ace::Custom(entry)).is_err() {
                break;
            }
        }
        prop_assert!(acl.binary_len() <= 65_535);
        prop_assert_eq!(Acl::from_bytes(&acl.to_bytes(), 0), Ok(acl));
    }

    #[test]
    fn prop_truncated_descriptors_fail_cleanly(descriptor in binary_descriptor_strategy(), cut in any::<prop::sample::Index>()) {
        let bytes = descriptor.to_bytes();
        let cut = cut.index(bytes.len());
        let result = SecurityDescriptor::from_bytes(&bytes[..cut], 0);
        prop_assert!(matches!(&result, Err(err) if err.is_malformed()), "截断到 {} 字节：{:?}", cut, result);
    }

    #[test]
    fn prop_random_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512), offset in 0usize..8) {
        let offset = offset.min(bytes.len());
        let _ = SecurityDescriptor::from_bytes(&bytes, offset);
        let _ = Acl::from_bytes(&bytes, offset);
        let _ = Ace::from_bytes(&bytes, offset);
        let _ = Sid::from_bytes(&bytes, offset);
    }

    #[test]
    fn prop_random_text_never_panics(text in "[OGDS:()A-Z0-9;x\\-]{0,64}") {
        let _ = SecurityDescriptor::from_sddl(&text);
    }
}
