use super::*;

fn allowed(role: Role, action: Action, resource: ResourceKind, own: bool) -> bool {
    authorize(role, action, resource, Ownership { actor_is_owner: own }).allow
}

#[test]
fn management_row() {
    use ResourceKind::*;
    for a in [Action::Create, Action::Update, Action::Delete] {
        assert!(allowed(Role::Management, a, User, false));
    }
    assert!(allowed(Role::Management, Action::Update, Client, false));
    assert!(allowed(Role::Management, Action::Assign, Client, false));
    assert!(!allowed(Role::Management, Action::Create, Client, false));
    assert!(!allowed(Role::Management, Action::Delete, Client, false));
    assert!(allowed(Role::Management, Action::Create, Contract, false));
    assert!(allowed(Role::Management, Action::Update, Contract, false));
    assert!(allowed(Role::Management, Action::Update, Event, false));
    assert!(allowed(Role::Management, Action::Assign, Event, false));
    assert!(!allowed(Role::Management, Action::Create, Event, true));
}

#[test]
fn commercial_row_depends_on_ownership() {
    use ResourceKind::*;
    assert!(allowed(Role::Commercial, Action::Create, Client, true));
    assert!(!allowed(Role::Commercial, Action::Create, Client, false));
    assert!(allowed(Role::Commercial, Action::Update, Client, true));
    assert!(!allowed(Role::Commercial, Action::Update, Client, false));
    assert!(!allowed(Role::Commercial, Action::Assign, Client, true));
    assert!(allowed(Role::Commercial, Action::Update, Contract, true));
    assert!(!allowed(Role::Commercial, Action::Update, Contract, false));
    assert!(!allowed(Role::Commercial, Action::Create, Contract, true));
    assert!(allowed(Role::Commercial, Action::Create, Event, true));
    assert!(!allowed(Role::Commercial, Action::Update, Event, true));
    for a in [Action::Create, Action::Update, Action::Delete] {
        assert!(!allowed(Role::Commercial, a, User, true));
    }
}

#[test]
fn support_row() {
    use ResourceKind::*;
    assert!(allowed(Role::Support, Action::Update, Event, true));
    assert!(!allowed(Role::Support, Action::Update, Event, false));
    assert!(!allowed(Role::Support, Action::Assign, Event, true));
    assert!(!allowed(Role::Support, Action::Create, Client, true));
    assert!(!allowed(Role::Support, Action::Update, Contract, true));
    assert!(!allowed(Role::Support, Action::Create, Event, true));
}

#[test]
fn everyone_reads_everything() {
    for r in Role::ALL {
        for res in ResourceKind::ALL {
            assert!(allowed(r, Action::Read, res, false), "{} should read {}", r, res);
        }
    }
}

#[test]
fn pure_and_deterministic() {
    for r in Role::ALL {
        for a in Action::ALL {
            for res in ResourceKind::ALL {
                for own in [false, true] {
                    let o = Ownership { actor_is_owner: own };
                    assert_eq!(authorize(r, a, res, o), authorize(r, a, res, o));
                }
            }
        }
    }
}

#[test]
fn grant_count_matches_table() {
    // (role, action, resource) triples allowed for an owner, reads excluded
    let mut n = 0;
    for r in Role::ALL {
        for a in Action::ALL {
            for res in ResourceKind::ALL {
                if a != Action::Read && allowed(r, a, res, true) { n += 1; }
            }
        }
    }
    // management 3+2+3+2, commercial 2+1+1, support 1
    assert_eq!(n, 15);
}

#[test]
fn nothing_deletes_except_management_users() {
    for r in Role::ALL {
        for res in ResourceKind::ALL {
            let expect = r == Role::Management && res == ResourceKind::User;
            assert_eq!(allowed(r, Action::Delete, res, true), expect);
        }
    }
}

#[test]
fn explain_mentions_rule() {
    let s = explain(Role::Support, Action::Create, ResourceKind::Client, Ownership::none());
    assert!(s.starts_with("deny"));
    assert!(s.contains("rule=default_deny"));
    let s = explain(Role::Commercial, Action::Update, ResourceKind::Client, Ownership::owner());
    assert!(s.contains("rule=commercial_own_client"));
}
