mod bind;
mod callbacks;
mod checkout;
mod helpers;
mod mocks;
mod vendor_calls;
