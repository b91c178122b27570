#[cfg(test)]
mod toml_utils;
