//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - chart values violate the service schema
pub const VALIDATION_ERROR: i32 = 2;

/// Chart error - invalid parameters (missing services, bad version, duplicate names)
pub const CHART_ERROR: i32 = 3;

/// Config error - unreadable or invalid configuration file
pub const CONFIG_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
