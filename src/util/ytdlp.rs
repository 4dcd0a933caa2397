use std::{env, path::PathBuf};

use crate::util::config::YtDlpSettings;

/// yt-dlp related environment overrides.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub cookies_from_browser: Option<String>,
    pub cookies_file: Option<String>,
    pub proxy: Option<String>,
    pub extra_args: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            cookies_from_browser: env::var("YTDLP_COOKIES_FROM_BROWSER").ok(),
            cookies_file: env::var("YTDLP_COOKIES_FILE").ok(),
            proxy: env::var("YTDLP_PROXY").ok(),
            extra_args: env::var("YTDLP_EXTRA_ARGS").ok(),
        }
    }
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Builds extra yt-dlp arguments from the `[yt_dlp]` section and the environment.
/// Environment values win over the config file.
pub fn extra_args(settings: Option<&YtDlpSettings>, envs: &EnvOverrides) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    // NOTE: YTDLP_EXTRA_ARGS is split on whitespace; prefer extra_args in the config for quoting
    if let Some(extra) = envs.extra_args.as_deref() {
        args.extend(extra.split_whitespace().map(str::to_string));
    }

    let mut push_pair = |flag: &str, env_val: &Option<String>, cfg_val: Option<&Option<String>>| {
        let value = non_blank(env_val).or_else(|| cfg_val.and_then(non_blank));
        if let Some(v) = value {
            args.push(flag.into());
            args.push(v.to_string());
        }
    };
    push_pair(
        "--cookies-from-browser",
        &envs.cookies_from_browser,
        settings.map(|s| &s.cookies_from_browser),
    );
    push_pair("--cookies", &envs.cookies_file, settings.map(|s| &s.cookies_file));
    push_pair("--proxy", &envs.proxy, settings.map(|s| &s.proxy));

    if let Some(extra) = settings.and_then(|s| s.extra_args.as_ref()) {
        args.extend(extra.iter().filter(|a| !a.trim().is_empty()).cloned());
    }
    args
}

/// Falls back to a `cookies.txt` next to the executable, then in the working directory,
/// unless cookies were configured explicitly.
pub fn cookies_args(settings: Option<&YtDlpSettings>, envs: &EnvOverrides) -> Vec<String> {
    if non_blank(&envs.cookies_from_browser).is_some() || non_blank(&envs.cookies_file).is_some() {
        return Vec::new();
    }
    if settings.is_some_and(|yt| {
        non_blank(&yt.cookies_from_browser).is_some() || non_blank(&yt.cookies_file).is_some()
    }) {
        return Vec::new();
    }

    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join("cookies.txt");
            if p.is_file() {
                return vec!["--cookies".into(), p.to_string_lossy().into_owned()];
            }
        }
    }
    let cwd_path = PathBuf::from("cookies.txt");
    if cwd_path.is_file() {
        return vec!["--cookies".into(), cwd_path.to_string_lossy().into_owned()];
    }
    Vec::new()
}

/// Base arguments + cookies + configured extras, in one list.
pub fn compose_user_args(
    mut base: Vec<String>,
    settings: Option<&YtDlpSettings>,
    envs: &EnvOverrides,
) -> Vec<String> {
    base.extend(cookies_args(settings, envs));
    base.extend(extra_args(settings, envs));
    base
}
