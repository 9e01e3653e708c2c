#[cfg(test)]
mod http;
#[cfg(test)]
mod unit;
