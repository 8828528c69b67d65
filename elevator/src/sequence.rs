use crate::request::{Request, RequestId};
use crate::Result;

#[derive(Debug)]
struct Node {
    request: Request,
    prev: Option<u32>,
    next: Option<u32>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Doubly linked list of requests stored in an arena and addressed by
/// [`RequestId`].
///
/// Freed slots are recycled; their generation is bumped so that a handle
/// to a removed request never resolves to whatever reuses the slot.
#[derive(Debug, Default)]
pub struct RequestSequence {
    slots: Vec<Slot>,
    free: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn front(&self) -> Option<RequestId> {
        self.head.map(|slot| self.id_of(slot))
    }

    pub fn back(&self) -> Option<RequestId> {
        self.tail.map(|slot| self.id_of(slot))
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.node(id).is_some()
    }

    pub fn get(&self, id: RequestId) -> Option<&Request> {
        self.node(id).map(|node| &node.request)
    }

    pub fn prev(&self, id: RequestId) -> Option<RequestId> {
        self.node(id)?.prev.map(|slot| self.id_of(slot))
    }

    pub fn next(&self, id: RequestId) -> Option<RequestId> {
        self.node(id)?.next.map(|slot| self.id_of(slot))
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            sequence: self,
            cursor: self.head,
        }
    }

    pub fn push_back(&mut self, request: Request) -> Result<RequestId> {
        self.insert_before(None, request)
    }

    /// Links `request` in front of `before`, or at the tail when `before`
    /// is `None` or no longer refers to a queued request.
    ///
    /// Fails without touching the list if the arena cannot grow.
    pub fn insert_before(&mut self, before: Option<RequestId>, request: Request) -> Result<RequestId> {
        let before = before.filter(|id| self.contains(*id)).map(|id| id.slot);
        let slot = self.alloc(request)?;

        let prev = match before {
            Some(at) => self.node_at(at).prev,
            None => self.tail,
        };

        if let Some(node) = self.node_at_mut(slot) {
            node.prev = prev;
            node.next = before;
        }
        match prev {
            Some(p) => {
                if let Some(node) = self.node_at_mut(p) {
                    node.next = Some(slot);
                }
            }
            None => self.head = Some(slot),
        }
        match before {
            Some(n) => {
                if let Some(node) = self.node_at_mut(n) {
                    node.prev = Some(slot);
                }
            }
            None => self.tail = Some(slot),
        }

        self.len += 1;
        Ok(self.id_of(slot))
    }

    /// Unlinks the request behind `id`. Stale handles yield `None`.
    pub fn remove(&mut self, id: RequestId) -> Option<Request> {
        if !self.contains(id) {
            return None;
        }
        let entry = &mut self.slots[id.slot as usize];
        let node = entry.node.take()?;
        entry.generation = entry.generation.wrapping_add(1);

        match node.prev {
            Some(p) => {
                if let Some(prev) = self.node_at_mut(p) {
                    prev.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(n) => {
                if let Some(next) = self.node_at_mut(n) {
                    next.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }

        // capacity for this push was reserved when the slot was created
        self.free.push(id.slot);
        self.len -= 1;
        Some(node.request)
    }

    pub fn pop_front(&mut self) -> Option<Request> {
        let id = self.front()?;
        self.remove(id)
    }

    fn alloc(&mut self, request: Request) -> Result<u32> {
        let node = Node {
            request,
            prev: None,
            next: None,
        };

        if let Some(slot) = self.free.pop() {
            self.slots[slot as usize].node = Some(node);
            return Ok(slot);
        }

        let slot = u32::try_from(self.slots.len()).map_err(|_| {
            crate::ElevatorError::ResourceExhausted("request arena is full".to_string())
        })?;
        self.slots.try_reserve(1)?;
        let needed = self.slots.len() + 1 - self.free.len();
        self.free.try_reserve(needed)?;

        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        Ok(slot)
    }

    fn id_of(&self, slot: u32) -> RequestId {
        RequestId {
            slot,
            generation: self.slots[slot as usize].generation,
        }
    }

    fn node(&self, id: RequestId) -> Option<&Node> {
        self.slots
            .get(id.slot as usize)
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.node.as_ref())
    }

    fn node_at(&self, slot: u32) -> &Node {
        self.slots[slot as usize]
            .node
            .as_ref()
            .unwrap_or_else(|| unreachable!("linked slot {} is vacant", slot))
    }

    fn node_at_mut(&mut self, slot: u32) -> Option<&mut Node> {
        self.slots.get_mut(slot as usize).and_then(|entry| entry.node.as_mut())
    }
}

/// Front-to-back iterator over a [`RequestSequence`].
pub struct Iter<'a> {
    sequence: &'a RequestSequence,
    cursor: Option<u32>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (RequestId, &'a Request);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let node = self.sequence.node_at(slot);
        self.cursor = node.next;
        Some((self.sequence.id_of(slot), &node.request))
    }
}
