//! Test binary with no worker: the start callback validates `ok` and
//! signals done before `remoteStart` is answered.

use std::process::ExitCode;

use insanity_core::Test;

fn main() -> ExitCode {
    let test = match Test::builder("direct-fixture", "Finishes inside the start callback")
        .checklist_item("ok", "The start callback ran", None, false)
    {
        Ok(builder) => builder
            .on_start(|t| {
                t.validate("ok", true, None);
                t.done();
                Ok(())
            })
            .build(),
        Err(e) => {
            eprintln!("fixture declarations: {e}");
            return ExitCode::FAILURE;
        }
    };
    test.run()
}
