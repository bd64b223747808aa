// This file is the module declaration file for the `builders` module.
// It holds the leaf components the engine is assembled from.

// `patterns` module:
// Builds anchored, whitespace-tolerant line patterns from directive literals
// and domains, and classifies a file's text against them (active, commented
// out, absent / present, absent).
pub mod patterns;

// `reporter` module:
// Turns operation outcomes and the status snapshot into console output,
// either as text or as JSON.
pub mod reporter;

// `storage` module:
// Reading configuration files, timestamped backups, and staged writes for
// files that need elevated privileges.
pub mod storage;

// `system` module:
// The narrow interfaces to the outside world: privileged copy, service
// restart, editor launch and the yes/no prompt, with their command-line
// implementations.
pub mod system;

// `templates` module:
// Renders virtual host stanzas from a domain and a document root.
pub mod templates;

// `validator` module:
// Sanity checks for a loaded `HelperConfig`.
pub mod validator;
