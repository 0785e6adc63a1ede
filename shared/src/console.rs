//! `tracing` output for the developer console. On wasm every line goes to
//! `console.{error,warn,info,debug}` by level; elsewhere to stderr.

use tracing::Level;

#[cfg(target_arch = "wasm32")]
mod browser {
    use std::io;

    use tracing::{Level, Metadata};
    use tracing_subscriber::fmt::MakeWriter;
    use wasm_bindgen::JsValue;

    #[derive(Clone, Copy)]
    pub struct ConsoleWriter {
        level: Level,
    }

    impl io::Write for ConsoleWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let line = String::from_utf8_lossy(buf);
            let line = line.trim_end();
            if !line.is_empty() {
                let value = JsValue::from_str(line);
                match self.level {
                    Level::ERROR => web_sys::console::error_1(&value),
                    Level::WARN => web_sys::console::warn_1(&value),
                    Level::INFO => web_sys::console::info_1(&value),
                    _ => web_sys::console::debug_1(&value),
                }
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Clone, Copy, Default)]
    pub struct ConsoleMakeWriter;

    impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
        type Writer = ConsoleWriter;

        fn make_writer(&'a self) -> Self::Writer {
            ConsoleWriter { level: Level::INFO }
        }

        fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
            ConsoleWriter {
                level: *meta.level(),
            }
        }
    }
}

/// Install a subscriber at `max_level`. Later calls are no-ops.
pub fn init(max_level: Level) {
    let builder = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .without_time()
        .with_target(false);

    #[cfg(target_arch = "wasm32")]
    let _ = builder.with_writer(browser::ConsoleMakeWriter).try_init();

    #[cfg(not(target_arch = "wasm32"))]
    let _ = builder.with_writer(std::io::stderr).try_init();
}
