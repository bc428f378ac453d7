use std::io::Write;

use anstyle::{AnsiColor, Color, RgbColor, Style};

/// 不同日志级别的前景色
fn level_color(level: log::Level) -> Option<Color> {
    match level {
        log::Level::Error => Some(Color::Ansi(AnsiColor::Red)),
        log::Level::Warn => Some(Color::Ansi(AnsiColor::Yellow)),
        log::Level::Info => Some(Color::Ansi(AnsiColor::Green)),
        _ => None,
    }
}

/// 初始化全局 logger
///
/// 默认级别为 Info，可通过 `RUST_LOG` 覆盖。重复调用是安全的，
/// 只有第一次调用会生效（测试中每个用例都可以调用）。
pub fn init_log() {
    let _ = env_logger::Builder::new()
        .format(|buf, record| {
            let level = record.level();
            let level_style = buf.default_level_style(level).fg_color(level_color(level));
            let location_style = Style::new().fg_color(Some(Color::Rgb(RgbColor(110, 110, 110))));

            let file = record.file().unwrap_or("").rsplit(['/', '\\']).next().unwrap_or("");
            let line = record.line().unwrap_or(0);
            let module = record.module_path().unwrap_or("");
            let time = chrono::Local::now().format("%Y/%m/%d %H:%M:%S");

            writeln!(
                buf,
                "{level_style}[{time}] {level}: {}{level_style:#}\n\t {location_style}In {module} At {file}:{line}{location_style:#}",
                record.args()
            )
        })
        .filter(None, log::LevelFilter::Info)
        .parse_default_env()
        .is_test(cfg!(test))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_log_twice() {
        init_log();
        init_log();
        log::info!("logger ready");
    }

    #[test]
    fn test_level_color() {
        assert_eq!(level_color(log::Level::Error), Some(Color::Ansi(AnsiColor::Red)));
        assert_eq!(level_color(log::Level::Trace), None);
    }
}
