// Platform detection based on environment variables
//
// Auto-detects runtime environment:
// - AWS Lambda: AWS_LAMBDA_FUNCTION_NAME env var present
// - Local: otherwise (CLI invocation, tests)

use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Local,
    Lambda,
}

impl Platform {
    /// Auto-detect the current platform based on environment variables.
    pub fn detect() -> Self {
        if env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
            Platform::Lambda
        } else {
            Platform::Local
        }
    }

    /// Platform-specific defaults. Lambda favors S3 region defaults and a
    /// tighter step timeout to stay inside the invocation budget; local runs
    /// get a longer timeout for interactive debugging.
    pub fn defaults(&self) -> PlatformDefaults {
        match self {
            Platform::Local => PlatformDefaults {
                step_timeout_secs: 300,
                region: "us-east-1",
            },
            Platform::Lambda => PlatformDefaults {
                step_timeout_secs: 120,
                region: "us-east-1",
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlatformDefaults {
    pub step_timeout_secs: u64,
    pub region: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_defaults() {
        let local = Platform::Local.defaults();
        assert_eq!(local.step_timeout_secs, 300);

        let lambda = Platform::Lambda.defaults();
        assert_eq!(lambda.step_timeout_secs, 120);
    }
}
