/// Hands out non-zero u32 ids, wrapping past `u32::MAX` back to 1.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        IdAllocator { next: 1 }
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(first: u32) -> Self {
        IdAllocator { next: first.max(1) }
    }

    /// Next id for which `in_use` is false.
    ///
    /// Callers guarantee the id space is never exhausted; the configured
    /// limits keep live ids far below `u32::MAX`.
    pub fn next_free(
        &mut self,
        in_use: impl Fn(u32) -> bool,
    ) -> u32 {
        loop {
            let id = self.next;
            self.next = match id {
                u32::MAX => 1,
                n => n + 1,
            };
            if !in_use(id) {
                return id;
            }
        }
    }
}
