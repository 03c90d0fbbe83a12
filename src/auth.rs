use anyhow::{Result, bail};
use std::io::{self, IsTerminal};
use zeroize::Zeroizing;

pub const PASSPHRASE_ENV: &str = "IMGVAULT_PASSPHRASE";

/// Reads the session passphrase.
///
/// Order: `IMGVAULT_PASSPHRASE`, then one line of piped stdin, then a TTY
/// prompt. `confirm` asks twice on a TTY, for the first import into an
/// empty vault where a typo would lock the images away.
pub fn read_passphrase(confirm: bool) -> Result<Zeroizing<String>> {
    //  IMGVAULT_PASSPHRASE="supersecret" imgvault import cat.png
    if let Ok(pw) = std::env::var(PASSPHRASE_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    //  echo "supersecret" | imgvault export 1 cat.png
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_line(&mut buf)?;
        trim_newline(&mut buf);

        if !buf.is_empty() {
            return Ok(buf);
        }
        bail!("passphrase cannot be empty");
    }

    let pw = Zeroizing::new(rpassword::prompt_password("Passphrase: ")?);
    if pw.is_empty() {
        bail!("passphrase cannot be empty");
    }

    if confirm {
        let again = Zeroizing::new(rpassword::prompt_password("Confirm passphrase: ")?);
        if *pw != *again {
            bail!("passphrases do not match");
        }
    }

    Ok(pw)
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_newline_strips_crlf_only() {
        let mut s = String::from("pass phrase \r\n");
        trim_newline(&mut s);
        assert_eq!(s, "pass phrase ");
    }
}
