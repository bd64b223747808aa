// This file is the module declaration file for the `core` module.
//
// `config` module:
// Defines `HelperConfig` (every path and command the tool touches) and the
// `ConfigManager`/`ConfigProvider` pair that loads and saves it as TOML.
pub mod config;

// `engine` module:
// The `ConfigMutator` orchestrator. It classifies a file, decides between a
// no-op, an in-place uncomment and an append, then backs up, writes and
// restarts Apache.
pub mod engine;

// `error` module:
// The `HelperError` taxonomy shared by every operation.
pub mod error;

// `hosts` module:
// `HostnameResolver`, which maps development domains in the hosts file.
pub mod hosts;
