// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持俄文（默认）和英文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// 引擎内部一律使用 t_in 显式传入语言, 不依赖全局 locale
// ==========================================

/// 支持的语言
pub const SUPPORTED_LOCALES: [&str; 2] = ["ru", "en"];

/// 默认语言
pub const DEFAULT_LOCALE: &str = "ru";

pub fn is_supported_locale(locale: &str) -> bool {
    SUPPORTED_LOCALES.contains(&locale)
}

/// 按指定语言翻译消息（带参数）
///
/// 不支持的语言回退到默认语言
///
/// # 示例
/// ```no_run
/// use timetable_engine::i18n::t_in;
/// let msg = t_in("en", "transfer.teacher_busy", &[("name", "Ivanov")]);
/// ```
pub fn t_in(locale: &str, key: &str, args: &[(&str, &str)]) -> String {
    let locale = if is_supported_locale(locale) {
        locale
    } else {
        DEFAULT_LOCALE
    };

    let mut result = rust_i18n::t!(key, locale = locale).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}
