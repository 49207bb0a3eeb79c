//! Test binary used by the controller integration tests.
//!
//! Behaviour is picked with the `mode` argument:
//!
//! - `pass`: validates `ok`, reports `mode-seen`, writes `dump` if a path
//!   was supplied, then signals done
//! - `fail`: validates `ok` as failed
//! - `slow`: pings five times, 300 ms apart, before passing
//! - `hang`: never signals anything
//! - `no-setup`: the setup callback fails

use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use insanity_core::Test;

fn main() -> ExitCode {
    let test = match build() {
        Ok(test) => test,
        Err(e) => {
            eprintln!("fixture declarations: {e}");
            return ExitCode::FAILURE;
        }
    };
    test.run()
}

fn build() -> Result<Test, insanity_core::RegistryError> {
    Ok(Test::builder("fixture", "Controller test fixture")
        .checklist_item("ok", "The selected mode passed", None, false)?
        .argument("mode", "What the fixture does", None, false, "pass")?
        .extra_info("mode-seen", "Mode read at start")?
        .output_file("dump", "Written in pass mode", false)?
        .on_setup(|t| {
            if t.argument_string("mode").as_deref() == Some("no-setup") {
                anyhow::bail!("setup refused on request");
            }
            Ok(())
        })
        .threaded(|t| {
            let mode = t.argument_string("mode").unwrap_or_default();
            t.extra_info("mode-seen", mode.as_str());
            match mode.as_str() {
                "hang" => return,
                "fail" => t.validate("ok", false, Some("asked to fail")),
                "slow" => {
                    for _ in 0..5 {
                        thread::sleep(Duration::from_millis(300));
                        t.ping();
                    }
                    t.validate("ok", true, None);
                }
                _ => {
                    if let Ok(path) = t.output_file("dump") {
                        let _ = std::fs::write(path, b"fixture");
                    }
                    t.validate("ok", true, None);
                }
            }
            t.done();
        })
        .build())
}
