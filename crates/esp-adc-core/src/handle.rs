//! Reference-counted resource table and opaque ADC handles
//!
//! The host runtime identifies native resources by type. [`ResourceType`]
//! stands in for that registration: create it once at start-up and pass it
//! to the binding. Handles carry the type id, a slot index and the slot's
//! generation, so a handle to a destroyed resource never reaches whatever
//! later reuses its slot.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use heapless::Vec;
use log::{debug, warn};

use crate::driver::AdcDriver;
use crate::error::{AdcError, AdcResult};
use crate::resource::AdcResource;
use crate::term::Term;

/// Maximum number of simultaneously open ADC resources
pub const MAX_ADC_RESOURCES: usize = 8;

static NEXT_RESOURCE_TYPE_ID: AtomicU32 = AtomicU32::new(1);

/// Registered native resource type.
///
/// Every call to [`ResourceType::register`] yields a distinct id; handles
/// minted under one registration are rejected by tables of another.
#[derive(Debug)]
pub struct ResourceType {
    id: u32,
    name: &'static str,
}

impl ResourceType {
    pub fn register(name: &'static str) -> Self {
        let id = NEXT_RESOURCE_TYPE_ID.fetch_add(1, Ordering::Relaxed);
        debug!("Registered resource type '{}' as {}", name, id);
        Self { id, name }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Opaque reference to an open ADC resource
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdcHandle {
    type_id: u32,
    slot: u16,
    generation: u32,
}

impl AdcHandle {
    /// Freshness token distinguishing this resource from earlier or later
    /// occupants of the same slot.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for AdcHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#Ref<{}.{}.{}>",
            self.type_id, self.slot, self.generation
        )
    }
}

struct Slot<'d, D: AdcDriver> {
    generation: u32,
    refcount: u32,
    resource: Option<AdcResource<'d, D>>,
}

/// Fixed-capacity table of live ADC resources with reference counts.
pub struct ResourceTable<'d, D: AdcDriver, const N: usize = MAX_ADC_RESOURCES> {
    type_id: u32,
    slots: Vec<Slot<'d, D>, N>,
}

impl<'d, D: AdcDriver, const N: usize> ResourceTable<'d, D, N> {
    pub fn new(resource_type: &ResourceType) -> Self {
        Self {
            type_id: resource_type.id(),
            slots: Vec::new(),
        }
    }

    /// Take ownership of `resource` with a reference count of one.
    ///
    /// When the table is full the resource is dropped, which releases its
    /// driver handles, and `OutOfMemory` is returned.
    pub fn insert(&mut self, resource: AdcResource<'d, D>) -> AdcResult<AdcHandle> {
        let index = match self.slots.iter().position(|slot| slot.resource.is_none()) {
            Some(index) => index,
            None => {
                let slot = Slot {
                    generation: 0,
                    refcount: 0,
                    resource: None,
                };
                if self.slots.push(slot).is_err() {
                    warn!("ADC resource table full ({} slots)", N);
                    return Err(AdcError::OutOfMemory);
                }
                self.slots.len() - 1
            }
        };

        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        slot.refcount = 1;
        slot.resource = Some(resource);

        Ok(AdcHandle {
            type_id: self.type_id,
            slot: index as u16,
            generation: slot.generation,
        })
    }

    fn slot_mut(&mut self, handle: &AdcHandle) -> Option<&mut Slot<'d, D>> {
        if handle.type_id != self.type_id {
            return None;
        }
        self.slots
            .get_mut(usize::from(handle.slot))
            .filter(|slot| slot.generation == handle.generation && slot.resource.is_some())
    }

    /// Capability check: is `handle` a live resource of this table?
    pub fn contains(&self, handle: &AdcHandle) -> bool {
        handle.type_id == self.type_id
            && self
                .slots
                .get(usize::from(handle.slot))
                .is_some_and(|slot| slot.generation == handle.generation && slot.resource.is_some())
    }

    /// Whether `term` is a handle to a live resource of this table.
    pub fn is_adc_resource(&self, term: &Term) -> bool {
        matches!(term, Term::Resource(handle) if self.contains(handle))
    }

    pub fn get_mut(&mut self, handle: &AdcHandle) -> Option<&mut AdcResource<'d, D>> {
        self.slot_mut(handle)?.resource.as_mut()
    }

    /// Add a reference. Returns `false` for stale or foreign handles.
    pub fn retain(&mut self, handle: &AdcHandle) -> bool {
        match self.slot_mut(handle) {
            Some(slot) => {
                slot.refcount += 1;
                true
            }
            None => false,
        }
    }

    /// Drop a reference; the resource is destroyed when the count reaches
    /// zero. Returns `false` for stale or foreign handles.
    pub fn release(&mut self, handle: &AdcHandle) -> bool {
        let Some(slot) = self.slot_mut(handle) else {
            return false;
        };
        slot.refcount -= 1;
        if slot.refcount == 0 {
            // Dropping the resource runs the destructor.
            slot.resource = None;
        }
        true
    }

    /// Number of live resources.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.resource.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
