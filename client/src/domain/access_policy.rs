//! Administrator allow-list.
//!
//! The policy is a pure predicate over an email address. Callers evaluate it
//! against the identity they hold at the moment of the decision instead of
//! caching the answer, so a changed identity is never judged by a stale
//! verdict.

/// Email addresses granted access to the admin dashboard.
pub const ADMIN_EMAILS: &[&str] = &["kshresth2151@gmail.com"];

/// Whether `email` belongs to an administrator.
///
/// Absent or empty input is never an administrator; the comparison ignores
/// ASCII case.
///
/// # Examples
/// ```
/// use campus_trace::domain::is_admin;
///
/// assert!(is_admin(Some("KShresth2151@Gmail.com")));
/// assert!(!is_admin(Some("student@example.edu")));
/// assert!(!is_admin(None));
/// ```
#[must_use]
pub fn is_admin(email: Option<&str>) -> bool {
    let Some(email) = email.filter(|value| !value.is_empty()) else {
        return false;
    };
    ADMIN_EMAILS
        .iter()
        .any(|admin| admin.eq_ignore_ascii_case(email))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("kshresth2151@gmail.com")]
    #[case("KSHRESTH2151@GMAIL.COM")]
    #[case("Kshresth2151@Gmail.Com")]
    fn every_case_variant_of_an_allow_listed_email_is_admin(#[case] email: &str) {
        assert!(is_admin(Some(email)));
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("student@vitstudent.ac.in"))]
    #[case(Some("kshresth2151@gmail.com.evil.test"))]
    #[case(Some(" kshresth2151@gmail.com"))]
    fn anything_off_the_list_is_not_admin(#[case] email: Option<&str>) {
        assert!(!is_admin(email));
    }

    #[test]
    fn allow_list_entries_are_stored_lowercase() {
        for admin in ADMIN_EMAILS {
            assert_eq!(*admin, admin.to_ascii_lowercase());
        }
    }
}
