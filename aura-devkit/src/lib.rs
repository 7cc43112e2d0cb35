/*!
# Aura DevKit - Outils de développement pour le kernel de sync

- Faux serveur matériel (GET /api/v1/nodes) pilotable depuis les tests
- Modes de panne : statut HTTP d'erreur, payload invalide, réponse lente
- Helpers pour construire des lectures de nodes au format matériel
*/

pub mod fake_hardware;

pub use fake_hardware::{reading, FailureMode, FakeHardwareServer};
