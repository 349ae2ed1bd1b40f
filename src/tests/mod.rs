
#[cfg(test)]
mod decode_tests;

#[cfg(test)]
mod pseudocode_tests;
