use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Standard,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
}

#[derive(Debug, Clone)]
pub struct User {
    pub name: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
struct ShareEntry {
    target: String,
    filename: String,
    permission: Permission,
}

/// In-memory user store and share list backing the ingress surfaces.
///
/// Ownership is encoded in the filename: `alice` owns every file named
/// `alice:...`. Shares grant read or write access on a single file to
/// another user; write implies read.
pub struct UserService {
    users: RwLock<HashMap<String, User>>,
    shares: RwLock<Vec<ShareEntry>>,
}

impl Default for UserService {
    fn default() -> Self {
        let service = Self {
            users: RwLock::new(HashMap::new()),
            shares: RwLock::new(Vec::new()),
        };
        // Seeded admin account, matching the reference deployment.
        service.create_user("admin", "admin", Role::Admin);
        service
    }
}

impl UserService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_user(&self, name: &str, password: &str, role: Role) -> bool {
        let mut users = self.users.write().expect("user store lock poisoned");
        if users.contains_key(name) {
            return false;
        }
        users.insert(
            name.to_string(),
            User {
                name: name.to_string(),
                password: password.to_string(),
                role,
            },
        );
        true
    }

    pub fn update_user(&self, name: &str, password: Option<&str>, role: Option<Role>) -> bool {
        let mut users = self.users.write().expect("user store lock poisoned");
        match users.get_mut(name) {
            Some(user) => {
                if let Some(password) = password {
                    user.password = password.to_string();
                }
                if let Some(role) = role {
                    user.role = role;
                }
                true
            }
            None => false,
        }
    }

    pub fn delete_user(&self, name: &str) -> bool {
        self.users
            .write()
            .expect("user store lock poisoned")
            .remove(name)
            .is_some()
    }

    pub fn promote_to_admin(&self, name: &str) -> bool {
        self.update_user(name, None, Some(Role::Admin))
    }

    /// Authenticate by name and password. Returns a snapshot of the user.
    pub fn auth(&self, name: Option<&str>, password: Option<&str>) -> Option<User> {
        let name = name?;
        let users = self.users.read().expect("user store lock poisoned");
        let user = users.get(name)?;
        match password {
            Some(p) if p != user.password => None,
            _ => Some(user.clone()),
        }
    }

    pub fn is_owner(&self, requester: &str, filename: &str) -> bool {
        filename.starts_with(&format!("{requester}:"))
    }

    pub fn can_read(&self, requester: &str, filename: &str) -> bool {
        self.is_owner(requester, filename) || self.has_share(requester, filename, false)
    }

    pub fn can_write(&self, requester: &str, filename: &str) -> bool {
        self.is_owner(requester, filename) || self.has_share(requester, filename, true)
    }

    fn has_share(&self, requester: &str, filename: &str, needs_write: bool) -> bool {
        self.shares
            .read()
            .expect("share list lock poisoned")
            .iter()
            .any(|s| {
                s.target == requester
                    && s.filename == filename
                    && (!needs_write || s.permission == Permission::Write)
            })
    }

    /// Grant `to` access on a file the owner controls.
    pub fn share(&self, owner: &str, to: &str, filename: &str, permission: Permission) -> bool {
        if !self.is_owner(owner, filename) {
            return false;
        }
        self.shares
            .write()
            .expect("share list lock poisoned")
            .push(ShareEntry {
                target: to.to_string(),
                filename: filename.to_string(),
                permission,
            });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_account_is_seeded() {
        let users = UserService::new();
        let admin = users.auth(Some("admin"), Some("admin")).unwrap();
        assert_eq!(admin.role, Role::Admin);
    }

    #[test]
    fn wrong_password_is_rejected() {
        let users = UserService::new();
        assert!(users.auth(Some("admin"), Some("nope")).is_none());
        assert!(users.auth(None, None).is_none());
    }

    #[test]
    fn duplicate_user_names_are_rejected() {
        let users = UserService::new();
        assert!(users.create_user("alice", "pw", Role::Standard));
        assert!(!users.create_user("alice", "other", Role::Standard));
    }

    #[test]
    fn ownership_follows_filename_prefix() {
        let users = UserService::new();
        users.create_user("alice", "pw", Role::Standard);
        assert!(users.can_write("alice", "alice:notes.txt"));
        assert!(!users.can_read("alice", "bob:notes.txt"));
    }

    #[test]
    fn read_share_grants_read_but_not_write() {
        let users = UserService::new();
        users.create_user("alice", "pw", Role::Standard);
        users.create_user("bob", "pw", Role::Standard);

        assert!(users.share("alice", "bob", "alice:doc", Permission::Read));
        assert!(users.can_read("bob", "alice:doc"));
        assert!(!users.can_write("bob", "alice:doc"));
    }

    #[test]
    fn write_share_implies_read() {
        let users = UserService::new();
        users.create_user("alice", "pw", Role::Standard);
        users.share("alice", "bob", "alice:doc", Permission::Write);

        assert!(users.can_read("bob", "alice:doc"));
        assert!(users.can_write("bob", "alice:doc"));
    }

    #[test]
    fn only_owner_can_share() {
        let users = UserService::new();
        users.create_user("mallory", "pw", Role::Standard);
        assert!(!users.share("mallory", "mallory", "alice:doc", Permission::Write));
    }

    #[test]
    fn promote_changes_role() {
        let users = UserService::new();
        users.create_user("alice", "pw", Role::Standard);
        assert!(users.promote_to_admin("alice"));
        assert_eq!(users.auth(Some("alice"), Some("pw")).unwrap().role, Role::Admin);
        assert!(!users.promote_to_admin("ghost"));
    }
}
