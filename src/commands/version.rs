//! Command: print version information.

/// Version string, preferring the `DOTFILES_VERSION` set at build time.
#[must_use]
pub fn version() -> &'static str {
    option_env!("DOTFILES_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the dotfiles version to stdout.
pub fn run() {
    println!("dotfiles {}", version());
}
