//! Test fixtures and runtime scripts shared across integration tests

use shared::ArtifactCoordinates;

pub struct TestFixtures;

impl TestFixtures {
    pub const GROUP: &'static str = "org.example.services";
    pub const LEDGER: &'static str = "ledger";
    pub const LEDGER_VERSION: &'static str = "v1.2.0";

    /// Property naming the directory where scripts record what they saw
    pub const OUTPUT_DIR_PROPERTY: &'static str = "STARTER_TEST_OUTPUT";

    pub const PORT_BASE: u16 = 2020;
    pub const DEBUG_PORT_BASE: u16 = 5005;

    pub fn ledger() -> ArtifactCoordinates {
        ArtifactCoordinates::service(Self::GROUP, Self::LEDGER, Self::LEDGER_VERSION)
    }

    /// Records its arguments and the environment it was launched with, then
    /// exits with 7. Reads `/proc` because shells drop variables whose names
    /// contain dots before running children.
    pub fn recording_runtime() -> &'static str {
        r#"#!/bin/sh
printf '%s\n' "$@" > "$STARTER_TEST_OUTPUT/args"
tr '\0' '\n' < /proc/$$/environ > "$STARTER_TEST_OUTPUT/env" 2>/dev/null
exit 7
"#
    }

    /// Runs until terminated
    pub fn long_running_runtime() -> &'static str {
        "#!/bin/sh\nexec sleep 30\n"
    }

    /// Ignores the termination request and has to be force-killed
    pub fn stubborn_runtime() -> &'static str {
        "#!/bin/sh\ntrap '' TERM\nwhile true; do sleep 1; done\n"
    }
}
