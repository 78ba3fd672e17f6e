use parking_lot::RwLock;

pub const HOME_PAGE: &str = "home";

#[derive(Debug)]
pub struct NavigationStore {
    current_page: RwLock<String>,
}

impl Default for NavigationStore {
    fn default() -> Self {
        Self {
            current_page: RwLock::new(HOME_PAGE.to_string()),
        }
    }
}

impl NavigationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_page(&self) -> String {
        self.current_page.read().clone()
    }

    pub fn set_current_page(&self, page: &str) {
        *self.current_page.write() = page.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_home() {
        let nav = NavigationStore::new();
        assert_eq!(nav.current_page(), "home");
        nav.set_current_page("camera-info");
        assert_eq!(nav.current_page(), "camera-info");
    }
}
