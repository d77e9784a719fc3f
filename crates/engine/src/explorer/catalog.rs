// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static catalogs: well-known directories, messaging apps, high-value
//! local-data apps and cloud-synced skip-list.
//!
//! OEMs move things around, so every logical directory carries multiple
//! candidate physical paths, probed in order.

/// A logical directory with candidate physical paths per platform.
pub struct KnownDir {
    pub key: &'static str,
    pub candidates: &'static [&'static str],
}

pub const KNOWN_DIRS: &[KnownDir] = &[
    KnownDir {
        key: "internal_storage",
        candidates: &[
            "/sdcard",
            "/storage/emulated/0",
            "/storage/self/primary",
            "/mnt/sdcard",
        ],
    },
    KnownDir {
        key: "dcim",
        candidates: &["/sdcard/DCIM", "/storage/emulated/0/DCIM"],
    },
    KnownDir {
        key: "pictures",
        candidates: &["/sdcard/Pictures", "/storage/emulated/0/Pictures"],
    },
    KnownDir {
        key: "downloads",
        candidates: &[
            "/sdcard/Download",
            "/storage/emulated/0/Download",
            "/sdcard/Downloads",
        ],
    },
    KnownDir {
        key: "documents",
        candidates: &["/sdcard/Documents", "/storage/emulated/0/Documents"],
    },
    KnownDir {
        key: "movies",
        candidates: &["/sdcard/Movies", "/storage/emulated/0/Movies"],
    },
    KnownDir {
        key: "music",
        candidates: &["/sdcard/Music", "/storage/emulated/0/Music"],
    },
    KnownDir {
        key: "external_sd",
        candidates: &[
            "/storage/sdcard1",
            "/storage/extSdCard",
            "/mnt/extSdCard",
            "/mnt/external_sd",
        ],
    },
];

/// A known messaging app with its packages and candidate media trees.
pub struct MessagingApp {
    pub key: &'static str,
    pub name: &'static str,
    pub packages: &'static [&'static str],
    pub media_paths: &'static [&'static str],
}

pub const MESSAGING_APPS: &[MessagingApp] = &[
    MessagingApp {
        key: "whatsapp",
        name: "WhatsApp",
        packages: &["com.whatsapp"],
        media_paths: &[
            "/sdcard/WhatsApp",
            "/sdcard/Android/media/com.whatsapp",
            "/storage/emulated/0/WhatsApp",
            "/storage/emulated/0/Android/media/com.whatsapp",
        ],
    },
    MessagingApp {
        key: "whatsapp_business",
        name: "WhatsApp Business",
        packages: &["com.whatsapp.w4b"],
        media_paths: &[
            "/sdcard/WhatsApp Business",
            "/sdcard/Android/media/com.whatsapp.w4b",
            "/storage/emulated/0/WhatsApp Business",
            "/storage/emulated/0/Android/media/com.whatsapp.w4b",
        ],
    },
    MessagingApp {
        key: "telegram",
        name: "Telegram",
        packages: &[
            "org.telegram.messenger",
            "org.telegram.messenger.web",
            "org.thunderdog.challegram",
        ],
        media_paths: &[
            "/sdcard/Telegram",
            "/storage/emulated/0/Telegram",
            "/sdcard/Android/media/org.telegram.messenger",
        ],
    },
    MessagingApp {
        key: "signal",
        name: "Signal",
        packages: &["org.thoughtcrime.securesms"],
        media_paths: &[
            "/sdcard/Signal",
            "/storage/emulated/0/Signal",
            "/sdcard/Android/media/org.thoughtcrime.securesms",
        ],
    },
    MessagingApp {
        key: "instagram",
        name: "Instagram",
        packages: &["com.instagram.android"],
        media_paths: &[
            "/sdcard/Instagram",
            "/sdcard/Pictures/Instagram",
            "/sdcard/Android/media/com.instagram.android",
        ],
    },
    MessagingApp {
        key: "facebook_messenger",
        name: "Messenger",
        packages: &["com.facebook.orca", "com.facebook.mlite"],
        media_paths: &[
            "/sdcard/Messenger",
            "/sdcard/Pictures/Messenger",
            "/sdcard/Android/media/com.facebook.orca",
        ],
    },
    MessagingApp {
        key: "discord",
        name: "Discord",
        packages: &["com.discord"],
        media_paths: &[
            "/sdcard/Discord",
            "/sdcard/Pictures/Discord",
            "/sdcard/Android/media/com.discord",
        ],
    },
    MessagingApp {
        key: "viber",
        name: "Viber",
        packages: &["com.viber.voip"],
        media_paths: &[
            "/sdcard/Viber",
            "/sdcard/Android/media/com.viber.voip",
            "/storage/emulated/0/Viber",
        ],
    },
    MessagingApp {
        key: "wechat",
        name: "WeChat",
        packages: &["com.tencent.mm"],
        media_paths: &[
            "/sdcard/tencent/MicroMsg",
            "/sdcard/Android/media/com.tencent.mm",
            "/storage/emulated/0/tencent/MicroMsg",
        ],
    },
    MessagingApp {
        key: "line",
        name: "LINE",
        packages: &["jp.naver.line.android"],
        media_paths: &[
            "/sdcard/LINE",
            "/sdcard/Android/media/jp.naver.line.android",
            "/sdcard/Pictures/LINE",
        ],
    },
    MessagingApp {
        key: "tiktok",
        name: "TikTok",
        packages: &["com.zhiliaoapp.musically", "com.ss.android.ugc.trill"],
        media_paths: &[
            "/sdcard/TikTok",
            "/sdcard/Pictures/TikTok",
            "/sdcard/Android/media/com.zhiliaoapp.musically",
            "/sdcard/Movies/TikTok",
        ],
    },
    MessagingApp {
        key: "twitter_x",
        name: "X (Twitter)",
        packages: &["com.twitter.android"],
        media_paths: &[
            "/sdcard/Twitter",
            "/sdcard/Pictures/Twitter",
            "/sdcard/Android/media/com.twitter.android",
        ],
    },
];

pub fn messaging_app(key: &str) -> Option<&'static MessagingApp> {
    MESSAGING_APPS.iter().find(|app| app.key == key)
}

/// Apps whose data lives in the cloud and needs no local backup.
pub const CLOUD_SYNCED_PACKAGES: &[&str] = &[
    "com.google.android.gms",
    "com.google.android.gsf",
    "com.google.android.apps.gmail",
    "com.google.android.apps.maps",
    "com.google.android.apps.photos",
    "com.google.android.apps.docs",
    "com.google.android.apps.calendar",
    "com.google.android.contacts",
    "com.google.android.apps.youtube",
    "com.google.android.apps.youtube.music",
    "com.google.android.keep",
    "com.google.android.apps.translate",
    "com.google.android.googlequicksearchbox",
    "com.android.vending",
    "com.android.chrome",
    "com.android.providers.downloads",
    "com.android.providers.contacts",
    "com.android.phone",
    "com.android.settings",
    "com.android.systemui",
    "com.samsung.android.calendar",
    "com.samsung.android.contacts",
    "com.sec.android.app.launcher",
    "com.netflix.mediaclient",
    "com.spotify.music",
    "com.facebook.katana",
    "com.linkedin.android",
    "com.pinterest",
    "com.snapchat.android",
    "com.reddit.frontpage",
    "com.microsoft.office.outlook",
    "com.microsoft.teams",
    "com.microsoft.skydrive",
    "com.dropbox.android",
    "com.ubercab",
];

/// How badly losing an app's local data hurts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Risk {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

impl std::fmt::Display for Risk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Risk::Critical => "critical",
            Risk::High => "high",
            Risk::Medium => "medium",
            Risk::Low => "low",
            Risk::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// One curated entry in the high-value local-data catalog.
pub struct CatalogApp {
    pub package: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub risk: Risk,
}

pub const UNSYNCED_CATALOG: &[CatalogApp] = &[
    // Authenticators: 2FA tokens gone for good if not saved
    CatalogApp { package: "com.google.android.apps.authenticator2", name: "Google Authenticator", category: "authenticator", risk: Risk::Critical },
    CatalogApp { package: "com.authy.authy", name: "Authy", category: "authenticator", risk: Risk::Critical },
    CatalogApp { package: "org.fedorahosted.freeotp", name: "FreeOTP", category: "authenticator", risk: Risk::Critical },
    CatalogApp { package: "com.azure.authenticator", name: "Microsoft Authenticator", category: "authenticator", risk: Risk::Critical },
    CatalogApp { package: "com.beemdevelopment.aegis", name: "Aegis Authenticator", category: "authenticator", risk: Risk::Critical },
    // Password managers with local vaults
    CatalogApp { package: "com.x8bit.bitwarden", name: "Bitwarden", category: "password_manager", risk: Risk::Critical },
    CatalogApp { package: "keepass2android.keepass2android", name: "KeePass2Android", category: "password_manager", risk: Risk::Critical },
    CatalogApp { package: "com.kunzisoft.keepass.free", name: "KeePassDX", category: "password_manager", risk: Risk::Critical },
    CatalogApp { package: "com.lastpass.lpandroid", name: "LastPass", category: "password_manager", risk: Risk::Critical },
    // Notes
    CatalogApp { package: "com.samsung.android.app.notes", name: "Samsung Notes", category: "notes", risk: Risk::High },
    CatalogApp { package: "md.obsidian", name: "Obsidian", category: "notes", risk: Risk::High },
    CatalogApp { package: "net.gsantner.markor", name: "Markor", category: "notes", risk: Risk::High },
    CatalogApp { package: "org.joplinapp.mobile", name: "Joplin", category: "notes", risk: Risk::High },
    CatalogApp { package: "com.automattic.simplenote", name: "Simplenote", category: "notes", risk: Risk::High },
    // Games with local saves
    CatalogApp { package: "com.supercell.clashofclans", name: "Clash of Clans", category: "game", risk: Risk::Medium },
    CatalogApp { package: "com.supercell.clashroyale", name: "Clash Royale", category: "game", risk: Risk::Medium },
    CatalogApp { package: "com.king.candycrushsaga", name: "Candy Crush", category: "game", risk: Risk::Medium },
    CatalogApp { package: "com.mojang.minecraftpe", name: "Minecraft", category: "game", risk: Risk::Medium },
    CatalogApp { package: "com.roblox.client", name: "Roblox", category: "game", risk: Risk::Medium },
    // Health / finance
    CatalogApp { package: "com.myfitnesspal.android", name: "MyFitnessPal", category: "health", risk: Risk::Medium },
    CatalogApp { package: "com.headspace.android", name: "Headspace", category: "health", risk: Risk::Low },
];

pub fn catalog_app(package: &str) -> Option<&'static CatalogApp> {
    UNSYNCED_CATALOG.iter().find(|app| app.package == package)
}
