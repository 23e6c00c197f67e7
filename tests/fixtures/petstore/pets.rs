use crate::models::{ApiError, NewPet, Pet};

/// Everything about your pets.
/// openapi:name pet
/// openapi:path /pet
/// openapi:security petstore_auth read:pets
pub trait PetApi {
    /// Find pet by ID
    ///
    /// Returns a single pet.
    /// openapi:operation GET /{petId} getPetById
    /// openapi:param petId path int64 true --- ID of pet to return
    /// openapi:response 200 Pet
    /// openapi:response 404 ApiError --- Pet not found
    fn get_pet_by_id(&self, pet_id: i64) -> Result<Pet, ApiError>;

    /// Add a new pet to the store
    /// openapi:operation POST / addPet
    /// openapi:body NewPet --- Pet object that needs to be added to the store
    /// openapi:consumes application/json application/xml
    /// openapi:response 201 Pet
    /// openapi:response 405 --- Invalid input
    /// openapi:security petstore_auth write:pets read:pets
    fn add_pet(&self, pet: NewPet) -> Result<Pet, ApiError>;

    /// Finds pets by status
    /// openapi:operation GET /findByStatus findPetsByStatus
    /// openapi:param status query string false --- Status values to filter by
    /// openapi:param limit query Order false
    /// openapi:response 200 Vec<Pet>
    fn find_by_status(&self, status: Option<String>) -> Vec<Pet>;

    /// Deletes a pet
    /// openapi:operation DELETE /{petId} deletePet
    /// openapi:param api_key header string false
    /// openapi:deprecated
    fn delete_pet(&self, pet_id: i64);

    /// Helper without annotations, not an operation.
    fn validate(&self, pet: &Pet) -> bool;
}
